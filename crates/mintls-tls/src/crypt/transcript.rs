//! Handshake hash for SSL 3.0 / TLS 1.0 / TLS 1.1.
//!
//! Keeps running MD5 and SHA-1 states over every handshake message (4-byte
//! header included, record header excluded). Digests are always taken from a
//! copy so accumulation can continue afterwards.

use mintls_crypto::md5::Md5;
use mintls_crypto::provider::Digest;
use mintls_crypto::sha1::Sha1;
use mintls_types::TlsError;

/// MD5 ‖ SHA-1 output length.
pub const HANDSHAKE_HASH_LEN: usize = 36;

const SSL3_MD5_PAD_LEN: usize = 48;
const SSL3_SHA1_PAD_LEN: usize = 40;

/// Running MD5 + SHA-1 over handshake messages.
#[derive(Clone, Default)]
pub struct HandshakeHash {
    md5: Md5,
    sha1: Sha1,
}

impl HandshakeHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed handshake message bytes in wire order.
    pub fn append(&mut self, data: &[u8]) -> Result<(), TlsError> {
        self.md5.update(data)?;
        self.sha1.update(data)?;
        Ok(())
    }

    /// Copy of both running states.
    pub fn snapshot(&self) -> HandshakeHash {
        self.clone()
    }

    /// `MD5(messages) || SHA1(messages)` without disturbing the running state.
    pub fn finished_hash(&self) -> Result<[u8; HANDSHAKE_HASH_LEN], TlsError> {
        let mut copy = self.snapshot();
        let mut out = [0u8; HANDSHAKE_HASH_LEN];
        copy.md5.finish(&mut out[..16])?;
        copy.sha1.finish(&mut out[16..])?;
        Ok(out)
    }

    /// SSL 3.0 combined hash, used for Finished (`sender` = "CLNT"/"SRVR")
    /// and CertificateVerify (empty `sender`):
    ///
    /// ```text
    /// MD5(ms || pad2 || MD5(messages || sender || ms || pad1)) ||
    /// SHA1(ms || pad2 || SHA1(messages || sender || ms || pad1))
    /// ```
    pub fn ssl3_hash(
        &self,
        master_secret: &[u8],
        sender: &[u8],
    ) -> Result<[u8; HANDSHAKE_HASH_LEN], TlsError> {
        let mut out = [0u8; HANDSHAKE_HASH_LEN];
        let copy = self.snapshot();

        let mut md5 = copy.md5;
        md5.update(sender)?;
        md5.update(master_secret)?;
        md5.update(&[0x36; SSL3_MD5_PAD_LEN])?;
        let mut inner = [0u8; 16];
        md5.finish(&mut inner)?;
        md5.update(master_secret)?;
        md5.update(&[0x5c; SSL3_MD5_PAD_LEN])?;
        md5.update(&inner)?;
        md5.finish(&mut out[..16])?;

        let mut sha1 = copy.sha1;
        sha1.update(sender)?;
        sha1.update(master_secret)?;
        sha1.update(&[0x36; SSL3_SHA1_PAD_LEN])?;
        let mut inner = [0u8; 20];
        sha1.finish(&mut inner)?;
        sha1.update(master_secret)?;
        sha1.update(&[0x5c; SSL3_SHA1_PAD_LEN])?;
        sha1.update(&inner)?;
        sha1.finish(&mut out[16..])?;

        Ok(out)
    }
}
