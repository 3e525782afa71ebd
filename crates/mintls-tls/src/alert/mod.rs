//! Alert protocol and connection shutdown state.

pub use mintls_types::{AlertDescription, AlertLevel};

use mintls_types::TlsError;

/// A TLS alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub description: AlertDescription,
}

impl Alert {
    pub fn new(level: AlertLevel, description: AlertDescription) -> Self {
        Self { level, description }
    }

    pub fn fatal(description: AlertDescription) -> Self {
        Self::new(AlertLevel::Fatal, description)
    }

    pub fn warning(description: AlertDescription) -> Self {
        Self::new(AlertLevel::Warning, description)
    }

    pub fn close_notify() -> Self {
        Self::warning(AlertDescription::CloseNotify)
    }

    /// Wire form: level(1) || description(1).
    pub fn encode(&self) -> [u8; 2] {
        [self.level as u8, self.description.to_u8()]
    }

    /// Parse an alert record payload: exactly two bytes with a known level.
    /// Any description byte is accepted.
    pub fn decode(payload: &[u8]) -> Result<Self, TlsError> {
        let [level, description] = payload else {
            return Err(TlsError::local(
                AlertDescription::DecodeError,
                format!("alert payload of {} bytes", payload.len()),
            ));
        };
        let level = AlertLevel::from_u8(*level).map_err(|v| {
            TlsError::local(AlertDescription::DecodeError, format!("unknown alert level {v}"))
        })?;
        Ok(Self {
            level,
            description: AlertDescription::from_u8(*description),
        })
    }

    pub fn is_close_notify(&self) -> bool {
        self.description == AlertDescription::CloseNotify
    }

    /// What receiving this alert does to the connection.
    pub fn disposition(&self) -> AlertDisposition {
        if self.is_close_notify() {
            AlertDisposition::CloseClean
        } else if self.level == AlertLevel::Warning {
            AlertDisposition::Absorb
        } else {
            AlertDisposition::CloseError
        }
    }
}

/// Effect of a received alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDisposition {
    /// close_notify: reply in kind, close cleanly, keep the session resumable.
    CloseClean,
    /// Other warnings: reply close_notify, stay open, session no longer resumable.
    Absorb,
    /// Fatal: close with error, session no longer resumable.
    CloseError,
}

/// Connection lifecycle. Both closed states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseState {
    #[default]
    Open,
    ClosedClean,
    ClosedError,
}

impl CloseState {
    pub fn is_closed(self) -> bool {
        self != CloseState::Open
    }

    /// Move to `ClosedClean` unless already closed.
    pub fn close_clean(&mut self) {
        if *self == CloseState::Open {
            *self = CloseState::ClosedClean;
        }
    }

    /// Move to `ClosedError` unless already closed.
    pub fn close_error(&mut self) {
        if *self == CloseState::Open {
            *self = CloseState::ClosedError;
        }
    }
}
