#![forbid(unsafe_code)]
#![doc = "Record layer and handshake message codec for SSL 3.0, TLS 1.0 and TLS 1.1."]

#[macro_use]
mod macros;

pub mod alert;
pub mod config;
pub mod connection;
pub mod connection_async;
pub mod crypt;
pub mod handshake;
pub mod record;
pub mod session;

pub use mintls_types::TlsError;

use crate::crypt::MacKind;

/// Protocol versions spoken by this stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    Ssl30,
    Tls10,
    Tls11,
}

/// Per-version record and handshake behaviour, looked up once per connection
/// instead of comparing version tuples on every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    /// Record MAC construction.
    pub mac: MacKind,
    /// CBC records carry a random IV block in front of the plaintext.
    pub explicit_iv: bool,
    /// Send an empty application-data record before each CBC message.
    pub empty_fragment_defense: bool,
    /// Finished verify_data length.
    pub finished_len: usize,
    /// Every padding byte must equal the padding length (SSL 3.0 only checks
    /// the length).
    pub check_padding_bytes: bool,
    /// RSA ClientKeyExchange carries a u16 length prefix.
    pub rsa_cke_length_prefixed: bool,
}

const SSL30_POLICY: VersionPolicy = VersionPolicy {
    mac: MacKind::Ssl3,
    explicit_iv: false,
    empty_fragment_defense: false,
    finished_len: 36,
    check_padding_bytes: false,
    rsa_cke_length_prefixed: false,
};

const TLS10_POLICY: VersionPolicy = VersionPolicy {
    mac: MacKind::HmacSha1,
    explicit_iv: false,
    empty_fragment_defense: true,
    finished_len: 12,
    check_padding_bytes: true,
    rsa_cke_length_prefixed: true,
};

const TLS11_POLICY: VersionPolicy = VersionPolicy {
    mac: MacKind::HmacSha1,
    explicit_iv: true,
    empty_fragment_defense: false,
    finished_len: 12,
    check_padding_bytes: true,
    rsa_cke_length_prefixed: true,
};

impl ProtocolVersion {
    /// Wire encoding `(major, minor)`.
    pub fn wire(self) -> (u8, u8) {
        match self {
            ProtocolVersion::Ssl30 => (3, 0),
            ProtocolVersion::Tls10 => (3, 1),
            ProtocolVersion::Tls11 => (3, 2),
        }
    }

    pub fn from_wire(major: u8, minor: u8) -> Option<Self> {
        match (major, minor) {
            (3, 0) => Some(ProtocolVersion::Ssl30),
            (3, 1) => Some(ProtocolVersion::Tls10),
            (3, 2) => Some(ProtocolVersion::Tls11),
            _ => None,
        }
    }

    pub fn policy(self) -> &'static VersionPolicy {
        match self {
            ProtocolVersion::Ssl30 => &SSL30_POLICY,
            ProtocolVersion::Tls10 => &TLS10_POLICY,
            ProtocolVersion::Tls11 => &TLS11_POLICY,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProtocolVersion::Ssl30 => "SSL 3.0",
            ProtocolVersion::Tls10 => "TLS 1.0",
            ProtocolVersion::Tls11 => "TLS 1.1",
        }
    }
}

/// TLS cipher suite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CipherSuite(pub u16);

impl CipherSuite {
    // SRP (RFC 5054)
    pub const TLS_SRP_SHA_WITH_3DES_EDE_CBC_SHA: Self = Self(0x0050);
    pub const TLS_SRP_SHA_WITH_AES_128_CBC_SHA: Self = Self(0x0053);
    pub const TLS_SRP_SHA_WITH_AES_256_CBC_SHA: Self = Self(0x0056);

    // SRP authenticated with an RSA signature
    pub const TLS_SRP_SHA_RSA_WITH_3DES_EDE_CBC_SHA: Self = Self(0x0051);
    pub const TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA: Self = Self(0x0054);
    pub const TLS_SRP_SHA_RSA_WITH_AES_256_CBC_SHA: Self = Self(0x0057);

    // RSA key transport
    pub const TLS_RSA_WITH_3DES_EDE_CBC_SHA: Self = Self(0x000A);
    pub const TLS_RSA_WITH_AES_128_CBC_SHA: Self = Self(0x002F);
    pub const TLS_RSA_WITH_AES_256_CBC_SHA: Self = Self(0x0035);
    pub const TLS_RSA_WITH_RC4_128_SHA: Self = Self(0x0005);

    /// Every suite the record layer can key.
    pub const ALL: [CipherSuite; 10] = [
        Self::TLS_SRP_SHA_WITH_AES_256_CBC_SHA,
        Self::TLS_SRP_SHA_WITH_AES_128_CBC_SHA,
        Self::TLS_SRP_SHA_WITH_3DES_EDE_CBC_SHA,
        Self::TLS_SRP_SHA_RSA_WITH_AES_256_CBC_SHA,
        Self::TLS_SRP_SHA_RSA_WITH_AES_128_CBC_SHA,
        Self::TLS_SRP_SHA_RSA_WITH_3DES_EDE_CBC_SHA,
        Self::TLS_RSA_WITH_AES_256_CBC_SHA,
        Self::TLS_RSA_WITH_AES_128_CBC_SHA,
        Self::TLS_RSA_WITH_3DES_EDE_CBC_SHA,
        Self::TLS_RSA_WITH_RC4_128_SHA,
    ];
}

/// The role of a TLS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsRole {
    Client,
    Server,
}

/// A synchronous TLS connection.
pub trait TlsConnection {
    /// Read decrypted application data into `buf`; 0 means the peer closed.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError>;
    /// Encrypt and send all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError>;
    /// Shut down the connection gracefully.
    fn shutdown(&mut self) -> Result<(), TlsError>;
    /// Get the negotiated protocol version.
    fn version(&self) -> Option<ProtocolVersion>;
    /// Get the negotiated cipher suite.
    fn cipher_suite(&self) -> Option<CipherSuite>;
}

/// An asynchronous TLS connection.
#[allow(async_fn_in_trait)]
pub trait AsyncTlsConnection {
    /// Read decrypted application data into `buf`; 0 means the peer closed.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError>;
    /// Encrypt and send all of `buf`.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError>;
    /// Shut down the connection gracefully.
    async fn shutdown(&mut self) -> Result<(), TlsError>;
    /// Get the negotiated protocol version.
    fn version(&self) -> Option<ProtocolVersion>;
    /// Get the negotiated cipher suite.
    fn cipher_suite(&self) -> Option<CipherSuite>;
}
