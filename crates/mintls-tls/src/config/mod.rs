//! TLS configuration with builder pattern.

use std::fmt;

use crate::handshake::CertificateType;
use crate::session::SharedSession;
use crate::{CipherSuite, ProtocolVersion, TlsRole};
use mintls_types::TlsError;

/// Smallest accepted asymmetric key size bound, in bits.
pub const KEY_SIZE_FLOOR: u32 = 512;
/// Largest accepted asymmetric key size bound, in bits.
pub const KEY_SIZE_CEILING: u32 = 16384;

/// TLS configuration.
#[derive(Clone)]
pub struct TlsConfig {
    /// The role (client or server).
    pub role: TlsRole,
    /// Lowest version accepted from the peer.
    pub min_version: ProtocolVersion,
    /// Highest version offered or accepted.
    pub max_version: ProtocolVersion,
    /// Enabled cipher suites (in preference order).
    pub cipher_suites: Vec<CipherSuite>,
    /// Accepted certificate types (in preference order).
    pub certificate_types: Vec<CertificateType>,
    /// Smallest SRP/RSA modulus the peer may use, in bits.
    pub min_key_size: u32,
    /// Largest SRP/RSA modulus the peer may use, in bits.
    pub max_key_size: u32,
    /// Treat EOF without close_notify as a clean close.
    pub ignore_abrupt_close: bool,
    /// Session to resume or share; a fresh one is created when absent.
    pub session: Option<SharedSession>,
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfig")
            .field("role", &self.role)
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("cipher_suites", &self.cipher_suites)
            .field("certificate_types", &self.certificate_types)
            .field("min_key_size", &self.min_key_size)
            .field("max_key_size", &self.max_key_size)
            .field("ignore_abrupt_close", &self.ignore_abrupt_close)
            .field("session", &self.session.as_ref().map(|_| "[shared]"))
            .finish()
    }
}

impl TlsConfig {
    pub fn builder() -> TlsConfigBuilder {
        TlsConfigBuilder::default()
    }

    /// Whether `version` lies within the configured range.
    pub fn accepts_version(&self, version: ProtocolVersion) -> bool {
        (self.min_version..=self.max_version).contains(&version)
    }
}

/// Builder for `TlsConfig`.
pub struct TlsConfigBuilder {
    role: TlsRole,
    min_version: ProtocolVersion,
    max_version: ProtocolVersion,
    cipher_suites: Vec<CipherSuite>,
    certificate_types: Vec<CertificateType>,
    min_key_size: u32,
    max_key_size: u32,
    ignore_abrupt_close: bool,
    session: Option<SharedSession>,
}

impl Default for TlsConfigBuilder {
    fn default() -> Self {
        Self {
            role: TlsRole::Client,
            min_version: ProtocolVersion::Ssl30,
            max_version: ProtocolVersion::Tls11,
            cipher_suites: CipherSuite::ALL.to_vec(),
            certificate_types: vec![CertificateType::X509],
            min_key_size: 1023,
            max_key_size: 8193,
            ignore_abrupt_close: false,
            session: None,
        }
    }
}

impl fmt::Debug for TlsConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsConfigBuilder")
            .field("role", &self.role)
            .field("cipher_suites", &self.cipher_suites)
            .finish_non_exhaustive()
    }
}

impl TlsConfigBuilder {
    pub fn role(mut self, role: TlsRole) -> Self {
        self.role = role;
        self
    }

    pub fn min_version(mut self, version: ProtocolVersion) -> Self {
        self.min_version = version;
        self
    }

    pub fn max_version(mut self, version: ProtocolVersion) -> Self {
        self.max_version = version;
        self
    }

    pub fn cipher_suites(mut self, suites: &[CipherSuite]) -> Self {
        self.cipher_suites = suites.to_vec();
        self
    }

    pub fn certificate_types(mut self, types: &[CertificateType]) -> Self {
        self.certificate_types = types.to_vec();
        self
    }

    pub fn min_key_size(mut self, bits: u32) -> Self {
        self.min_key_size = bits;
        self
    }

    pub fn max_key_size(mut self, bits: u32) -> Self {
        self.max_key_size = bits;
        self
    }

    pub fn ignore_abrupt_close(mut self, ignore: bool) -> Self {
        self.ignore_abrupt_close = ignore;
        self
    }

    pub fn session(mut self, session: SharedSession) -> Self {
        self.session = Some(session);
        self
    }

    /// Validate the settings and produce a `TlsConfig`.
    pub fn build(self) -> Result<TlsConfig, TlsError> {
        for (name, bits) in [
            ("min_key_size", self.min_key_size),
            ("max_key_size", self.max_key_size),
        ] {
            if !(KEY_SIZE_FLOOR..=KEY_SIZE_CEILING).contains(&bits) {
                return Err(TlsError::Config(format!(
                    "{name} {bits} outside {KEY_SIZE_FLOOR}..={KEY_SIZE_CEILING}"
                )));
            }
        }
        if self.min_key_size > self.max_key_size {
            return Err(TlsError::Config(
                "min_key_size larger than max_key_size".into(),
            ));
        }
        if self.min_version > self.max_version {
            return Err(TlsError::Config("versions set incorrectly".into()));
        }
        if self.cipher_suites.is_empty() {
            return Err(TlsError::Config("no cipher suites".into()));
        }
        if let Some(s) = self
            .cipher_suites
            .iter()
            .find(|s| !CipherSuite::ALL.contains(s))
        {
            return Err(TlsError::Config(format!(
                "unsupported cipher suite 0x{:04x}",
                s.0
            )));
        }
        if self.certificate_types.is_empty() {
            return Err(TlsError::Config("no certificate types".into()));
        }
        if let Some(t) = self.certificate_types.iter().find(|t| {
            **t != CertificateType::X509 && **t != CertificateType::CRYPTO_ID
        }) {
            return Err(TlsError::Config(format!(
                "unknown certificate type {}",
                t.0
            )));
        }

        Ok(TlsConfig {
            role: self.role,
            min_version: self.min_version,
            max_version: self.max_version,
            cipher_suites: self.cipher_suites,
            certificate_types: self.certificate_types,
            min_key_size: self.min_key_size,
            max_key_size: self.max_key_size,
            ignore_abrupt_close: self.ignore_abrupt_close,
            session: self.session,
        })
    }
}
