//! Cryptographic glue between the record layer and `mintls-crypto`.
//!
//! Everything version-specific about keying (PRF flavour, MAC construction,
//! Finished hashing) lives in this module tree.

pub mod cipher;
pub mod key_schedule;
pub mod mac;
pub mod prf;
pub mod transcript;

use crate::CipherSuite;
use mintls_crypto::md5::Md5;
use mintls_crypto::provider::Digest;
use mintls_crypto::sha1::Sha1;
use mintls_types::{AlertDescription, TlsError};

pub use mac::MacKind;

/// Fresh MD5 context behind the provider trait.
pub fn md5_factory() -> Box<dyn Digest> {
    Box::new(Md5::new())
}

/// Fresh SHA-1 context behind the provider trait.
pub fn sha1_factory() -> Box<dyn Digest> {
    Box::new(Sha1::new())
}

/// How the premaster secret is agreed for a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExchangeAlg {
    Rsa,
    Srp,
    /// SRP with the server parameters signed by an RSA certificate.
    SrpRsa,
}

/// Bulk encryption algorithm of a suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAlgorithm {
    Aes128Cbc,
    Aes256Cbc,
    TripleDesCbc,
    Rc4_128,
}

impl BulkAlgorithm {
    /// Short lowercase name ("aes128", "aes256", "3des", "rc4").
    pub fn name(self) -> &'static str {
        match self {
            BulkAlgorithm::Aes128Cbc => "aes128",
            BulkAlgorithm::Aes256Cbc => "aes256",
            BulkAlgorithm::TripleDesCbc => "3des",
            BulkAlgorithm::Rc4_128 => "rc4",
        }
    }

    pub fn is_block(self) -> bool {
        !matches!(self, BulkAlgorithm::Rc4_128)
    }
}

/// Key material sizes for a legacy cipher suite.
#[derive(Debug, Clone)]
pub struct CipherSuiteParams {
    pub suite: CipherSuite,
    pub key_exchange: KeyExchangeAlg,
    pub bulk: BulkAlgorithm,
    /// MAC key length (SHA-1 for every supported suite).
    pub mac_key_len: usize,
    pub key_len: usize,
    /// 0 for stream ciphers.
    pub iv_len: usize,
}

impl CipherSuiteParams {
    /// Look up parameters for a supported suite.
    pub fn from_suite(suite: CipherSuite) -> Result<Self, TlsError> {
        use BulkAlgorithm::*;
        use KeyExchangeAlg::*;
        let (key_exchange, bulk) = match suite {
            CipherSuite::TLS_SRP_SHA_WITH_3DES_EDE_CBC_SHA => (Srp, TripleDesCbc),
            CipherSuite::TLS_SRP_SHA_WITH_AES_128_CBC_SHA => (Srp, Aes128Cbc),
            CipherSuite::TLS_SRP_SHA_WITH_AES_256_CBC_SHA => (Srp, Aes256Cbc),
            CipherSuite::TLS_SRP_SHA_RSA_WITH_3DES_EDE_CBC_SHA => (SrpRsa, TripleDesCbc),
            CipherSuite::TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA => (SrpRsa, Aes128Cbc),
            CipherSuite::TLS_SRP_SHA_RSA_WITH_AES_256_CBC_SHA => (SrpRsa, Aes256Cbc),
            CipherSuite::TLS_RSA_WITH_3DES_EDE_CBC_SHA => (Rsa, TripleDesCbc),
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA => (Rsa, Aes128Cbc),
            CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA => (Rsa, Aes256Cbc),
            CipherSuite::TLS_RSA_WITH_RC4_128_SHA => (Rsa, Rc4_128),
            _ => {
                return Err(TlsError::local(
                    AlertDescription::IllegalParameter,
                    format!("unsupported cipher suite 0x{:04x}", suite.0),
                ))
            }
        };
        let (key_len, iv_len) = match bulk {
            Aes128Cbc => (16, 16),
            Aes256Cbc => (32, 16),
            TripleDesCbc => (24, 8),
            Rc4_128 => (16, 0),
        };
        Ok(Self {
            suite,
            key_exchange,
            bulk,
            mac_key_len: 20,
            key_len,
            iv_len,
        })
    }

    /// Total key block length: two MAC keys, two cipher keys, two IVs.
    pub fn key_block_len(&self) -> usize {
        2 * (self.mac_key_len + self.key_len + self.iv_len)
    }
}
