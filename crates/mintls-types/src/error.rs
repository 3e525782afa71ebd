use crate::alert::{AlertDescription, AlertLevel};

/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid argument")]
    InvalidArg,
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("invalid iv length")]
    InvalidIvLength,
    #[error("buffer length not enough: need {need}, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("input is not a multiple of the block size")]
    InputNotBlockAligned,
    #[error("failed to obtain randomness")]
    RandomFail,
}

/// TLS protocol errors.
///
/// Every fatal protocol condition carries the alert description that was (or
/// would have been) sent to the peer, so callers can tell `decode_error` from
/// `bad_record_mac` without string matching.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// A fatal alert raised locally and sent to the peer.
    #[error("local alert {description}: {message}")]
    LocalAlert {
        description: AlertDescription,
        message: String,
    },
    /// An alert received from the peer.
    #[error("remote alert {level} {description}")]
    RemoteAlert {
        level: AlertLevel,
        description: AlertDescription,
    },
    /// The transport reached EOF without a preceding alert.
    #[error("connection closed abruptly without close_notify")]
    AbruptClose,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),
}

impl TlsError {
    /// Build a locally raised fatal alert.
    pub fn local(description: AlertDescription, message: impl Into<String>) -> Self {
        TlsError::LocalAlert {
            description,
            message: message.into(),
        }
    }

    /// The alert description carried by this error, local or remote.
    pub fn alert_description(&self) -> Option<AlertDescription> {
        match self {
            TlsError::LocalAlert { description, .. } | TlsError::RemoteAlert { description, .. } => {
                Some(*description)
            }
            _ => None,
        }
    }

    /// True for the peer's close_notify.
    pub fn is_close_notify(&self) -> bool {
        matches!(
            self,
            TlsError::RemoteAlert {
                description: AlertDescription::CloseNotify,
                ..
            }
        )
    }
}
