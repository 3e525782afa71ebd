//! RC4 stream cipher with 128-bit keys (the only size the legacy suites use).

use crate::provider::StreamCipher;
use ::rc4::consts::U16;
use ::rc4::KeyInit;
use mintls_types::CryptoError;

/// RC4 key length in bytes.
pub const RC4_KEY_SIZE: usize = 16;

/// RC4 keystream state.
pub struct Rc4 {
    inner: ::rc4::Rc4<U16>,
}

impl Rc4 {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != RC4_KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: RC4_KEY_SIZE,
                got: key.len(),
            });
        }
        let inner = ::rc4::Rc4::<U16>::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { inner })
    }
}

impl StreamCipher for Rc4 {
    fn apply_keystream(&mut self, data: &mut [u8]) {
        ::rc4::StreamCipher::apply_keystream(&mut self.inner, data);
    }
}
