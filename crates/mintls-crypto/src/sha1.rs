//! SHA-1 message digest algorithm (FIPS 180-4).
//!
//! **Security warning**: SHA-1 is considered cryptographically weak due to
//! demonstrated collision attacks. It is provided for the legacy record MAC,
//! PRF and handshake hash constructions only.

use crate::provider::Digest;
use mintls_types::CryptoError;

/// SHA-1 output size in bytes.
pub const SHA1_OUTPUT_SIZE: usize = 20;

/// SHA-1 block size in bytes.
pub const SHA1_BLOCK_SIZE: usize = 64;

/// SHA-1 hash context.
#[derive(Clone, Default)]
pub struct Sha1 {
    inner: ::sha1::Sha1,
}

impl Sha1 {
    /// Create a new SHA-1 hash context.
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot: compute the SHA-1 digest of `data`.
    pub fn digest(data: &[u8]) -> [u8; SHA1_OUTPUT_SIZE] {
        let mut ctx = ::sha1::Sha1::default();
        ::sha1::Digest::update(&mut ctx, data);
        let mut out = [0u8; SHA1_OUTPUT_SIZE];
        out.copy_from_slice(&::sha1::Digest::finalize(ctx));
        out
    }
}

impl Digest for Sha1 {
    fn output_size(&self) -> usize {
        SHA1_OUTPUT_SIZE
    }

    fn block_size(&self) -> usize {
        SHA1_BLOCK_SIZE
    }

    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        ::sha1::Digest::update(&mut self.inner, data);
        Ok(())
    }

    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        if out.len() < SHA1_OUTPUT_SIZE {
            return Err(CryptoError::BufferTooSmall {
                need: SHA1_OUTPUT_SIZE,
                got: out.len(),
            });
        }
        let digest = ::sha1::Digest::finalize_reset(&mut self.inner);
        out[..SHA1_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }

    fn reset(&mut self) {
        ::sha1::Digest::reset(&mut self.inner);
    }

    fn box_clone(&self) -> Box<dyn Digest> {
        Box::new(self.clone())
    }
}
