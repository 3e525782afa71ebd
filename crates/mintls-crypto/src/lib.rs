#![forbid(unsafe_code)]
#![doc = "Primitive provider for the mintls record layer: MD5, SHA-1, AES, 3DES, RC4, HMAC and randomness."]

// Core traits
pub mod provider;

// Hash algorithms
pub mod md5;
pub mod sha1;

// Symmetric ciphers
pub mod aes;
pub mod des;
pub mod rc4;

// MAC algorithms
pub mod hmac;

// Randomness
pub mod rand;

pub use provider::{BlockCipher, Digest, StreamCipher};
