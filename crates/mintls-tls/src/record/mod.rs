//! Record layer: header parsing, serialization and per-direction protection.

pub mod encryption;

use crate::crypt::key_schedule::derive_states;
use crate::{CipherSuite, ProtocolVersion, TlsRole};
use encryption::ConnectionState;
use mintls_types::{AlertDescription, TlsError};
use tracing::{debug, trace};

/// Largest plaintext fragment the sender produces.
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// Largest record body accepted from the wire (fragment + 2048 of expansion).
pub const MAX_RECORD_LEN: usize = 18432;

/// TLS record header length.
pub const TLS_HEADER_LEN: usize = 5;

/// SSLv2-compatible record header length.
pub const SSL2_HEADER_LEN: usize = 2;

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            20 => Some(ContentType::ChangeCipherSpec),
            21 => Some(ContentType::Alert),
            22 => Some(ContentType::Handshake),
            23 => Some(ContentType::ApplicationData),
            _ => None,
        }
    }
}

/// A parsed record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub content_type: ContentType,
    /// Wire version; `(2, 0)` for an SSLv2-framed ClientHello.
    pub version: (u8, u8),
    pub length: usize,
    /// True for the 2-byte SSLv2-compatible framing.
    pub ssl2: bool,
}

impl RecordHeader {
    /// Header length implied by the first byte of a record.
    pub fn header_len(first: u8) -> Result<usize, TlsError> {
        match first {
            20..=23 => Ok(TLS_HEADER_LEN),
            0x80 => Ok(SSL2_HEADER_LEN),
            _ => Err(TlsError::local(
                AlertDescription::DecodeError,
                format!("unknown record type byte {first}"),
            )),
        }
    }

    /// Parse a complete header (`header_len(bytes[0])` bytes).
    ///
    /// A declared length above [`MAX_RECORD_LEN`] is `record_overflow`, raised
    /// before any of the body is read.
    pub fn parse(bytes: &[u8]) -> Result<Self, TlsError> {
        let first = *bytes
            .first()
            .ok_or_else(|| TlsError::local(AlertDescription::DecodeError, "empty record header"))?;
        let hlen = Self::header_len(first)?;
        if bytes.len() < hlen {
            return Err(TlsError::local(
                AlertDescription::DecodeError,
                "truncated record header",
            ));
        }
        let header = if hlen == SSL2_HEADER_LEN {
            RecordHeader {
                content_type: ContentType::Handshake,
                version: (2, 0),
                length: usize::from(bytes[1]),
                ssl2: true,
            }
        } else {
            let content_type = ContentType::from_u8(first).ok_or_else(|| {
                TlsError::local(AlertDescription::DecodeError, "unknown content type")
            })?;
            RecordHeader {
                content_type,
                version: (bytes[1], bytes[2]),
                length: usize::from(u16::from_be_bytes([bytes[3], bytes[4]])),
                ssl2: false,
            }
        };
        if header.length > MAX_RECORD_LEN {
            return Err(TlsError::local(
                AlertDescription::RecordOverflow,
                format!("record length {} exceeds {MAX_RECORD_LEN}", header.length),
            ));
        }
        Ok(header)
    }

    pub fn header_len_of(&self) -> usize {
        if self.ssl2 {
            SSL2_HEADER_LEN
        } else {
            TLS_HEADER_LEN
        }
    }
}

/// Serialize a TLS record.
pub fn encode_record(content_type: ContentType, version: (u8, u8), fragment: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(TLS_HEADER_LEN + fragment.len());
    buf.push(content_type as u8);
    buf.push(version.0);
    buf.push(version.1);
    buf.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
    buf.extend_from_slice(fragment);
    buf
}

/// Active and pending connection states for both directions.
///
/// Protection starts empty; `set_pending` installs derived keys, and the
/// `activate_*` calls move them into service (sequence number 0) when
/// ChangeCipherSpec is sent or received.
pub struct RecordLayer {
    max_fragment_size: usize,
    version: ProtocolVersion,
    read: ConnectionState,
    write: ConnectionState,
    pending_read: Option<ConnectionState>,
    pending_write: Option<ConnectionState>,
}

impl RecordLayer {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            max_fragment_size: MAX_FRAGMENT_LEN,
            version,
            read: ConnectionState::default(),
            write: ConnectionState::default(),
            pending_read: None,
            pending_write: None,
        }
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Maximum plaintext per record (default: 16384).
    pub fn max_fragment_size(&self) -> usize {
        self.max_fragment_size
    }

    /// Lower the per-record plaintext limit; clamped to `1..=MAX_FRAGMENT_LEN`.
    pub fn set_max_fragment_size(&mut self, size: usize) {
        self.max_fragment_size = size.clamp(1, MAX_FRAGMENT_LEN);
    }

    /// Version written into record headers and MACs from now on.
    pub fn set_version(&mut self, version: ProtocolVersion) {
        self.version = version;
    }

    /// Install pending states for both directions.
    pub fn set_pending(&mut self, read: ConnectionState, write: ConnectionState) {
        self.pending_read = Some(read);
        self.pending_write = Some(write);
    }

    /// Derive pending states from the master secret and install them.
    pub fn calc_pending_states(
        &mut self,
        role: TlsRole,
        master_secret: &[u8],
        client_random: &[u8; 32],
        server_random: &[u8; 32],
        suite: CipherSuite,
    ) -> Result<(), TlsError> {
        let (read, write) = derive_states(
            self.version,
            role,
            master_secret,
            client_random,
            server_random,
            suite,
        )?;
        self.set_pending(read, write);
        debug!(suite = suite.0, version = self.version.name(), "pending states derived");
        Ok(())
    }

    /// Pending write becomes active (after sending ChangeCipherSpec).
    pub fn activate_write(&mut self) -> Result<(), TlsError> {
        self.write = self.pending_write.take().ok_or_else(|| {
            TlsError::local(AlertDescription::InternalError, "no pending write state")
        })?;
        debug!("write state activated");
        Ok(())
    }

    /// Pending read becomes active (after receiving ChangeCipherSpec).
    pub fn activate_read(&mut self) -> Result<(), TlsError> {
        self.read = self.pending_read.take().ok_or_else(|| {
            TlsError::local(
                AlertDescription::UnexpectedMessage,
                "ChangeCipherSpec without pending read state",
            )
        })?;
        debug!("read state activated");
        Ok(())
    }

    pub fn has_pending_read(&self) -> bool {
        self.pending_read.is_some()
    }

    pub fn read_state(&self) -> &ConnectionState {
        &self.read
    }

    pub fn write_state(&self) -> &ConnectionState {
        &self.write
    }

    /// Whether an empty application-data record must precede the next message.
    pub fn needs_empty_fragment(&self) -> bool {
        self.version.policy().empty_fragment_defense && self.write.is_block_cipher()
    }

    /// Protect and serialize one fragment.
    pub fn seal_record(
        &mut self,
        content_type: ContentType,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if plaintext.len() > self.max_fragment_size {
            return Err(TlsError::local(
                AlertDescription::InternalError,
                "plaintext exceeds max fragment size",
            ));
        }
        let fragment = self.write.seal(content_type, self.version, plaintext)?;
        trace!(
            content_type = content_type as u8,
            len = plaintext.len(),
            seq = self.write.sequence_number(),
            "record sealed"
        );
        Ok(encode_record(content_type, self.version.wire(), &fragment))
    }

    /// Decrypt and verify the body of a record whose header was already parsed.
    pub fn open_record(
        &mut self,
        header: &RecordHeader,
        fragment: Vec<u8>,
    ) -> Result<Vec<u8>, TlsError> {
        trace!(
            content_type = header.content_type as u8,
            len = header.length,
            seq = self.read.sequence_number(),
            "record received"
        );
        self.read
            .open(header.content_type, self.version, fragment)
    }
}
