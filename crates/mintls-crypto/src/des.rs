//! Triple DES (EDE, three independent keys) block cipher.

use crate::provider::BlockCipher;
use ::des::cipher::generic_array::GenericArray;
use ::des::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use mintls_types::CryptoError;

/// 3DES block size in bytes.
pub const DES_BLOCK_SIZE: usize = 8;

/// 3DES-EDE key length in bytes.
pub const TDES_KEY_SIZE: usize = 24;

/// A 3DES-EDE key schedule.
#[derive(Clone)]
pub struct TripleDesKey {
    inner: ::des::TdesEde3,
}

impl TripleDesKey {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != TDES_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: TDES_KEY_SIZE,
                got: key.len(),
            });
        }
        let inner = ::des::TdesEde3::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { inner })
    }
}

impl BlockCipher for TripleDesKey {
    fn block_size(&self) -> usize {
        DES_BLOCK_SIZE
    }

    fn key_size(&self) -> usize {
        TDES_KEY_SIZE
    }

    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        if block.len() != DES_BLOCK_SIZE {
            return Err(CryptoError::InputNotBlockAligned);
        }
        self.inner.encrypt_block(GenericArray::from_mut_slice(block));
        Ok(())
    }

    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError> {
        if block.len() != DES_BLOCK_SIZE {
            return Err(CryptoError::InputNotBlockAligned);
        }
        self.inner.decrypt_block(GenericArray::from_mut_slice(block));
        Ok(())
    }
}
