//! HMAC (Hash-based Message Authentication Code) implementation.
//!
//! HMAC(K, m) = H((K' XOR opad) || H((K' XOR ipad) || m))
//!
//! where K' is the key padded/hashed to block size, ipad = 0x36, opad = 0x5c.

use std::sync::Arc;

use crate::provider::{Digest, HashFactory};
use mintls_types::CryptoError;
use zeroize::Zeroize;

/// HMAC context using a boxed Digest for the underlying hash.
pub struct Hmac {
    /// Inner hash context (initialized with ipad-xored key).
    inner: Box<dyn Digest>,
    /// Outer hash context (initialized with opad-xored key).
    outer: Box<dyn Digest>,
    /// Factory to create fresh digest instances (for reset).
    factory: Arc<HashFactory>,
    /// Processed key block (for reset).
    key_block: Vec<u8>,
}

impl Hmac {
    /// Create a new HMAC instance with the given key and hash factory.
    pub fn new(
        hash_factory: impl Fn() -> Box<dyn Digest> + Send + Sync + 'static,
        key: &[u8],
    ) -> Result<Self, CryptoError> {
        Self::with_factory(Arc::new(hash_factory), key)
    }

    /// Create an HMAC instance sharing an existing factory.
    pub fn with_factory(factory: Arc<HashFactory>, key: &[u8]) -> Result<Self, CryptoError> {
        let sample = factory();
        let block_size = sample.block_size();
        let output_size = sample.output_size();
        drop(sample);

        let mut key_block = vec![0u8; block_size];
        if key.len() > block_size {
            let mut hasher = factory();
            hasher.update(key)?;
            let mut hashed_key = vec![0u8; output_size];
            hasher.finish(&mut hashed_key)?;
            key_block[..output_size].copy_from_slice(&hashed_key);
            hashed_key.zeroize();
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let (inner, outer) = Self::keyed_pair(&factory, &key_block)?;
        Ok(Self {
            inner,
            outer,
            factory,
            key_block,
        })
    }

    fn keyed_pair(
        factory: &Arc<HashFactory>,
        key_block: &[u8],
    ) -> Result<(Box<dyn Digest>, Box<dyn Digest>), CryptoError> {
        let mut inner = factory();
        let mut outer = factory();

        let mut ipad_key: Vec<u8> = key_block.iter().map(|b| b ^ 0x36).collect();
        inner.update(&ipad_key)?;
        ipad_key.zeroize();

        let mut opad_key: Vec<u8> = key_block.iter().map(|b| b ^ 0x5c).collect();
        outer.update(&opad_key)?;
        opad_key.zeroize();

        Ok((inner, outer))
    }

    /// Output length in bytes.
    pub fn output_size(&self) -> usize {
        self.inner.output_size()
    }

    /// Feed data into the HMAC computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.inner.update(data)
    }

    /// Finalize the HMAC computation and write the result to `out`.
    pub fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let output_size = self.inner.output_size();
        let mut inner_hash = vec![0u8; output_size];
        self.inner.finish(&mut inner_hash)?;

        self.outer.update(&inner_hash)?;
        inner_hash.zeroize();

        self.outer.finish(out)
    }

    /// Reset the HMAC state for reuse with the same key.
    pub fn reset(&mut self) -> Result<(), CryptoError> {
        let (inner, outer) = Self::keyed_pair(&self.factory, &self.key_block)?;
        self.inner = inner;
        self.outer = outer;
        Ok(())
    }

    /// Copy of this context in its current (keyed, possibly fed) state.
    pub fn fork(&self) -> Hmac {
        Hmac {
            inner: self.inner.box_clone(),
            outer: self.outer.box_clone(),
            factory: Arc::clone(&self.factory),
            key_block: self.key_block.clone(),
        }
    }

    /// One-shot HMAC computation.
    pub fn mac(
        hash_factory: impl Fn() -> Box<dyn Digest> + Send + Sync + 'static,
        key: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = Self::new(hash_factory, key)?;
        ctx.update(data)?;
        let mut out = vec![0u8; ctx.output_size()];
        ctx.finish(&mut out)?;
        Ok(out)
    }
}

impl Drop for Hmac {
    fn drop(&mut self) {
        self.key_block.zeroize();
    }
}
