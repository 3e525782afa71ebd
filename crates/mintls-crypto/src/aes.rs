//! AES (Advanced Encryption Standard) block cipher.
//!
//! Provides AES-128, AES-192 and AES-256 single-block operations; the CBC
//! chaining used by the record layer lives in `mintls-tls`.

use crate::provider::BlockCipher;
use ::aes::cipher::generic_array::GenericArray;
use ::aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use mintls_types::CryptoError;

/// AES block size in bytes (128 bits).
pub const AES_BLOCK_SIZE: usize = 16;

/// An AES key with expanded round keys.
#[derive(Clone)]
pub enum AesKey {
    Aes128(::aes::Aes128),
    Aes192(::aes::Aes192),
    Aes256(::aes::Aes256),
}

impl AesKey {
    /// Create a new AES key from raw bytes.
    ///
    /// Accepts 16, 24, or 32-byte keys for AES-128, AES-192, and AES-256.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let invalid = |_| CryptoError::InvalidKey;
        match key.len() {
            16 => ::aes::Aes128::new_from_slice(key).map(AesKey::Aes128).map_err(invalid),
            24 => ::aes::Aes192::new_from_slice(key).map(AesKey::Aes192).map_err(invalid),
            32 => ::aes::Aes256::new_from_slice(key).map(AesKey::Aes256).map_err(invalid),
            got => Err(CryptoError::InvalidKeyLength { expected: 16, got }),
        }
    }

    fn check_block(block: &[u8]) -> Result<(), CryptoError> {
        if block.len() != AES_BLOCK_SIZE {
            return Err(CryptoError::InputNotBlockAligned);
        }
        Ok(())
    }
}

impl BlockCipher for AesKey {
    fn block_size(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn key_size(&self) -> usize {
        match self {
            AesKey::Aes128(_) => 16,
            AesKey::Aes192(_) => 24,
            AesKey::Aes256(_) => 32,
        }
    }

    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        Self::check_block(block)?;
        let block = GenericArray::from_mut_slice(block);
        match self {
            AesKey::Aes128(c) => c.encrypt_block(block),
            AesKey::Aes192(c) => c.encrypt_block(block),
            AesKey::Aes256(c) => c.encrypt_block(block),
        }
        Ok(())
    }

    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        Self::check_block(block)?;
        let block = GenericArray::from_mut_slice(block);
        match self {
            AesKey::Aes128(c) => c.decrypt_block(block),
            AesKey::Aes192(c) => c.decrypt_block(block),
            AesKey::Aes256(c) => c.decrypt_block(block),
        }
        Ok(())
    }
}
