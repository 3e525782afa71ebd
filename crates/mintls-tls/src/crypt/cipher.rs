//! Bulk ciphers with record-to-record chaining state.
//!
//! CBC keeps the last ciphertext block of each record as the IV of the next
//! one; RC4 keeps its keystream position.

use super::BulkAlgorithm;
use mintls_crypto::aes::AesKey;
use mintls_crypto::des::TripleDesKey;
use mintls_crypto::rc4::Rc4;
use mintls_crypto::{BlockCipher, StreamCipher};
use mintls_types::{CryptoError, TlsError};
use zeroize::Zeroize;

/// CBC mode over a provider block cipher.
pub struct CbcCipher {
    cipher: Box<dyn BlockCipher>,
    iv: Vec<u8>,
}

impl CbcCipher {
    pub fn new(cipher: Box<dyn BlockCipher>, iv: &[u8]) -> Result<Self, CryptoError> {
        if iv.len() != cipher.block_size() {
            return Err(CryptoError::InvalidIvLength);
        }
        Ok(Self {
            cipher,
            iv: iv.to_vec(),
        })
    }

    pub fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    /// Encrypt `data` in place; its length must be a multiple of the block size.
    pub fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CryptoError> {
        let bs = self.block_size();
        if data.len() % bs != 0 {
            return Err(CryptoError::InputNotBlockAligned);
        }
        for block in data.chunks_mut(bs) {
            for (b, v) in block.iter_mut().zip(self.iv.iter()) {
                *b ^= v;
            }
            self.cipher.encrypt_block(block)?;
            self.iv.copy_from_slice(block);
        }
        Ok(())
    }

    /// Decrypt `data` in place; its length must be a multiple of the block size.
    pub fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CryptoError> {
        let bs = self.block_size();
        if data.len() % bs != 0 {
            return Err(CryptoError::InputNotBlockAligned);
        }
        let mut saved = vec![0u8; bs];
        for block in data.chunks_mut(bs) {
            saved.copy_from_slice(block);
            self.cipher.decrypt_block(block)?;
            for (b, v) in block.iter_mut().zip(self.iv.iter()) {
                *b ^= v;
            }
            self.iv.copy_from_slice(&saved);
        }
        Ok(())
    }
}

impl Drop for CbcCipher {
    fn drop(&mut self) {
        self.iv.zeroize();
    }
}

pub enum CipherEngine {
    Cbc(CbcCipher),
    Stream(Box<dyn StreamCipher>),
}

/// The keyed bulk cipher of one direction.
pub struct BulkCipher {
    pub algorithm: BulkAlgorithm,
    pub engine: CipherEngine,
}

impl BulkCipher {
    pub fn new(algorithm: BulkAlgorithm, key: &[u8], iv: &[u8]) -> Result<Self, TlsError> {
        let engine = match algorithm {
            BulkAlgorithm::Aes128Cbc | BulkAlgorithm::Aes256Cbc => {
                CipherEngine::Cbc(CbcCipher::new(Box::new(AesKey::new(key)?), iv)?)
            }
            BulkAlgorithm::TripleDesCbc => {
                CipherEngine::Cbc(CbcCipher::new(Box::new(TripleDesKey::new(key)?), iv)?)
            }
            BulkAlgorithm::Rc4_128 => CipherEngine::Stream(Box::new(Rc4::new(key)?)),
        };
        Ok(Self { algorithm, engine })
    }

    /// Block size for CBC ciphers, `None` for stream ciphers.
    pub fn block_size(&self) -> Option<usize> {
        match &self.engine {
            CipherEngine::Cbc(c) => Some(c.block_size()),
            CipherEngine::Stream(_) => None,
        }
    }

    pub fn encrypt(&mut self, data: &mut [u8]) -> Result<(), CryptoError> {
        match &mut self.engine {
            CipherEngine::Cbc(c) => c.encrypt(data),
            CipherEngine::Stream(s) => {
                s.apply_keystream(data);
                Ok(())
            }
        }
    }

    pub fn decrypt(&mut self, data: &mut [u8]) -> Result<(), CryptoError> {
        match &mut self.engine {
            CipherEngine::Cbc(c) => c.decrypt(data),
            CipherEngine::Stream(s) => {
                s.apply_keystream(data);
                Ok(())
            }
        }
    }
}
