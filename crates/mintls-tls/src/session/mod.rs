//! Session state shared between connections.
//!
//! A handshake produces both a connection and a session. The session keeps
//! the master secret and negotiated parameters so a later connection can
//! resume it, or is created directly from a shared key.

use std::sync::{Arc, Mutex};

use crate::crypt::key_schedule::{derive_master_secret, MASTER_SECRET_LEN};
use crate::crypt::prf::prf;
use crate::crypt::CipherSuiteParams;
use crate::handshake::codec::CertificateChain;
use crate::{CipherSuite, ProtocolVersion};
use mintls_types::TlsError;
use zeroize::Zeroize;

/// Longest shared-key username (it becomes the 16-byte session id).
pub const MAX_SHARED_KEY_USERNAME_LEN: usize = 16;

/// Longest shared key (one length byte plus the key must fit the premaster).
pub const MAX_SHARED_KEY_LEN: usize = 47;

/// Handle through which several connections see the same session.
pub type SharedSession = Arc<Mutex<Session>>;

/// A TLS session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub master_secret: Vec<u8>,
    pub session_id: Vec<u8>,
    pub cipher_suite: Option<CipherSuite>,
    pub srp_username: Option<String>,
    pub shared_key_username: Option<String>,
    pub client_cert_chain: Option<CertificateChain>,
    pub server_cert_chain: Option<CertificateChain>,
    /// May be offered for resumption. Cleared on any fatal condition.
    pub resumable: bool,
    /// Created from a shared key rather than a handshake.
    pub shared_key: bool,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.master_secret.zeroize();
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in a [`SharedSession`].
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Compute and store the master secret.
    pub fn calc_master_secret(
        &mut self,
        version: ProtocolVersion,
        pre_master: &[u8],
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<(), TlsError> {
        let ms = derive_master_secret(version, pre_master, client_random, server_random)?;
        self.master_secret.zeroize();
        self.master_secret = ms;
        Ok(())
    }

    /// Whether this session can be used to start a new connection.
    pub fn valid(&self) -> bool {
        self.resumable || self.shared_key
    }

    /// Update the resumable flag.
    ///
    /// Shared-key sessions are left untouched, and the flag can only be
    /// raised when a session id exists.
    pub fn set_resumable(&mut self, resumable: bool) {
        if self.shared_key {
            return;
        }
        if !resumable || !self.session_id.is_empty() {
            self.resumable = resumable;
        }
    }

    /// Turn this session into a shared-key session.
    ///
    /// The session id is the username zero-padded to 16 bytes. The premaster
    /// secret repeats `len(key) || key` over 48 bytes and the master secret is
    /// `PRF(premaster, "shared secret", "", 48)`.
    pub fn create_shared_key(&mut self, username: &str, key: &[u8]) -> Result<(), TlsError> {
        if username.len() > MAX_SHARED_KEY_USERNAME_LEN {
            return Err(TlsError::Config(format!(
                "shared key username longer than {MAX_SHARED_KEY_USERNAME_LEN} bytes"
            )));
        }
        if key.len() > MAX_SHARED_KEY_LEN {
            return Err(TlsError::Config(format!(
                "shared key longer than {MAX_SHARED_KEY_LEN} bytes"
            )));
        }

        let mut session_id = vec![0u8; MAX_SHARED_KEY_USERNAME_LEN];
        session_id[..username.len()].copy_from_slice(username.as_bytes());

        let mut material = Vec::with_capacity(key.len() + 1);
        material.push(key.len() as u8);
        material.extend_from_slice(key);
        let mut pre_master: Vec<u8> = material
            .iter()
            .copied()
            .cycle()
            .take(MASTER_SECRET_LEN)
            .collect();
        let ms = prf(&pre_master, b"shared secret", &[], MASTER_SECRET_LEN);
        pre_master.zeroize();
        material.zeroize();

        self.master_secret.zeroize();
        self.master_secret = ms?;
        self.session_id = session_id;
        self.shared_key_username = Some(username.to_string());
        self.shared_key = true;
        Ok(())
    }

    /// Bulk cipher name of the session's suite: "aes128", "aes256", "3des"
    /// or "rc4".
    pub fn cipher_name(&self) -> Option<&'static str> {
        let suite = self.cipher_suite?;
        CipherSuiteParams::from_suite(suite)
            .ok()
            .map(|p| p.bulk.name())
    }
}
