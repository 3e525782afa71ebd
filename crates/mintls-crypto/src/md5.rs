//! MD5 message digest (RFC 1321).
//!
//! **Security warning**: MD5 is broken for collision resistance. It is kept
//! only because SSL 3.0 and TLS 1.0/1.1 hard-wire it into the PRF, the
//! handshake hashes and RSA signatures.

use crate::provider::Digest;
use mintls_types::CryptoError;

/// MD5 output size in bytes.
pub const MD5_OUTPUT_SIZE: usize = 16;

/// MD5 block size in bytes.
pub const MD5_BLOCK_SIZE: usize = 64;

/// MD5 hash context.
#[derive(Clone, Default)]
pub struct Md5 {
    inner: ::md5::Md5,
}

impl Md5 {
    /// Create a new MD5 hash context.
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot: compute the MD5 digest of `data`.
    pub fn digest(data: &[u8]) -> [u8; MD5_OUTPUT_SIZE] {
        let mut ctx = ::md5::Md5::default();
        ::md5::Digest::update(&mut ctx, data);
        let mut out = [0u8; MD5_OUTPUT_SIZE];
        out.copy_from_slice(&::md5::Digest::finalize(ctx));
        out
    }
}

impl Digest for Md5 {
    fn output_size(&self) -> usize {
        MD5_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        MD5_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        ::md5::Digest::update(&mut self.inner, data);
        Ok(())
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < MD5_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: MD5_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        let digest = ::md5::Digest::finalize_reset(&mut self.inner);
        out[..MD5_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }

    fn reset(&mut self) {
        ::md5::Digest::reset(&mut self.inner);
    }

    fn box_clone(&self) -> Box<dyn Digest> {
        Box::new(self.clone())
    }
}
