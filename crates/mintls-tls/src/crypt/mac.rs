//! Record MACs: HMAC-SHA1 for TLS 1.0/1.1, the SSL 3.0 keyed-hash construction
//! for SSL 3.0.
//!
//! ```text
//! TLS:  HMAC_SHA1(key, seq || type || version || length || fragment)
//! SSL3: SHA1(key || pad2 || SHA1(key || pad1 || seq || type || length || fragment))
//! ```

use super::sha1_factory;
use mintls_crypto::hmac::Hmac;
use mintls_crypto::provider::Digest;
use mintls_crypto::sha1::Sha1;
use mintls_types::TlsError;
use zeroize::Zeroize;

const SSL3_PAD_LEN_SHA1: usize = 40;
const SSL3_PAD1: [u8; SSL3_PAD_LEN_SHA1] = [0x36; SSL3_PAD_LEN_SHA1];
const SSL3_PAD2: [u8; SSL3_PAD_LEN_SHA1] = [0x5c; SSL3_PAD_LEN_SHA1];

/// Which MAC construction a protocol version uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacKind {
    HmacSha1,
    Ssl3,
}

/// A keyed record MAC for one direction.
pub enum RecordMac {
    Hmac(Hmac),
    Ssl3 { key: Vec<u8> },
}

impl RecordMac {
    pub fn new(kind: MacKind, key: &[u8]) -> Result<Self, TlsError> {
        Ok(match kind {
            MacKind::HmacSha1 => RecordMac::Hmac(Hmac::new(sha1_factory, key)?),
            MacKind::Ssl3 => RecordMac::Ssl3 { key: key.to_vec() },
        })
    }

    /// MAC output length (20 for every supported suite).
    pub fn output_size(&self) -> usize {
        match self {
            RecordMac::Hmac(h) => h.output_size(),
            RecordMac::Ssl3 { .. } => 20,
        }
    }

    /// MAC over the pseudo-header and `data`. `version` is ignored for SSL 3.0.
    pub fn compute(
        &self,
        seq: u64,
        content_type: u8,
        version: (u8, u8),
        data: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let len = (data.len() as u16).to_be_bytes();
        let mut out = vec![0u8; self.output_size()];
        match self {
            RecordMac::Hmac(keyed) => {
                let mut ctx = keyed.fork();
                ctx.update(&seq.to_be_bytes())?;
                ctx.update(&[content_type, version.0, version.1])?;
                ctx.update(&len)?;
                ctx.update(data)?;
                ctx.finish(&mut out)?;
            }
            RecordMac::Ssl3 { key } => {
                let mut inner = Sha1::new();
                inner.update(key)?;
                inner.update(&SSL3_PAD1)?;
                inner.update(&seq.to_be_bytes())?;
                inner.update(&[content_type])?;
                inner.update(&len)?;
                inner.update(data)?;
                let mut inner_hash = [0u8; 20];
                inner.finish(&mut inner_hash)?;

                let mut outer = Sha1::new();
                outer.update(key)?;
                outer.update(&SSL3_PAD2)?;
                outer.update(&inner_hash)?;
                outer.finish(&mut out)?;
            }
        }
        Ok(out)
    }
}

impl Drop for RecordMac {
    fn drop(&mut self) {
        if let RecordMac::Ssl3 { key } = self {
            key.zeroize();
        }
    }
}
