//! Trait-based provider mechanism for cryptographic algorithms.
//!
//! The record layer only ever talks to these traits; concrete algorithms are
//! picked once when a cipher suite's pending state is derived.

use mintls_types::CryptoError;

/// A hash / message digest algorithm.
pub trait Digest: Send + Sync {
    /// The output size in bytes.
    fn output_size(&self) -> usize;

    /// The internal block size in bytes.
    fn block_size(&self) -> usize;

    /// Feed data into the hash state.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;

    /// Finalize the hash and write the digest to `out`, then reset the state.
    /// The length of `out` must be at least `output_size()`.
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;

    /// Reset the hash state to process a new message.
    fn reset(&mut self);

    /// Copy the running state into a new boxed digest.
    fn box_clone(&self) -> Box<dyn Digest>;
}

/// Factory producing fresh digest contexts.
pub type HashFactory = dyn Fn() -> Box<dyn Digest> + Send + Sync;

/// A block cipher (AES, 3DES).
pub trait BlockCipher: Send + Sync {
    /// Block size in bytes.
    fn block_size(&self) -> usize;

    /// Key size in bytes.
    fn key_size(&self) -> usize;

    /// Encrypt a single block in-place.
    fn encrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;

    /// Decrypt a single block in-place.
    fn decrypt_block(&self, block: &mut [u8]) -> Result<(), CryptoError>;
}

/// A keystream cipher (RC4). Encryption and decryption are the same operation.
pub trait StreamCipher: Send + Sync {
    /// XOR the next `data.len()` keystream bytes into `data`.
    fn apply_keystream(&mut self, data: &mut [u8]);
}

/// One-shot digest of `data` with a fresh context from `factory`.
pub fn hash_once(factory: &HashFactory, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let mut ctx = factory();
    ctx.update(data)?;
    let mut out = vec![0u8; ctx.output_size()];
    ctx.finish(&mut out)?;
    Ok(out)
}
