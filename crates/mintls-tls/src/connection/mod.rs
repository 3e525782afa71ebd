//! Synchronous connection over a `Read + Write` transport.
//!
//! The connection drives the record layer, handshake reassembly, the
//! handshake hash and the alert machine. Deciding which handshake messages to
//! send and expect is left to the caller: it sends messages with
//! [`Connection::send_handshake`], pulls them with
//! [`Connection::receive_handshake`], installs keys with
//! [`Connection::calc_pending_states`] and finishes with
//! [`Connection::send_finished`] / [`Connection::get_finished`].
//!
//! A transport returning `WouldBlock` or `Interrupted` is retried in place,
//! so a partially written record resumes at the unsent offset. `WouldBlock`
//! backs off with short sleeps; to multiplex non-blocking transports on one
//! thread use [`AsyncConnection`](crate::connection_async::AsyncConnection).

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroize;

use crate::alert::{Alert, AlertDescription, AlertDisposition, CloseState};
use crate::config::TlsConfig;
use crate::crypt::key_schedule::compute_verify_data;
use crate::crypt::transcript::HandshakeHash;
use crate::crypt::CipherSuiteParams;
use crate::handshake::codec::{
    decode_client_hello_ssl2, decode_handshake, encode_handshake, Finished,
};
use crate::handshake::fragment::HandshakeBuffer;
use crate::handshake::{CertificateType, CodecContext, HandshakeMessage, HandshakeType};
use crate::record::{ContentType, RecordHeader, RecordLayer};
use crate::session::{Session, SharedSession};
use crate::{CipherSuite, ProtocolVersion, TlsConnection, TlsError, TlsRole};

/// The only valid ChangeCipherSpec payload.
pub const CHANGE_CIPHER_SPEC_BYTE: u8 = 1;

const BACKOFF_MIN: Duration = Duration::from_micros(50);
const BACKOFF_MAX: Duration = Duration::from_millis(10);

/// Wait policy for a transport that is not ready. `Interrupted` retries at
/// once; `WouldBlock` sleeps, doubling from 50us up to 10ms until progress.
#[derive(Debug, Default)]
struct Backoff {
    delay: Option<Duration>,
}

impl Backoff {
    /// Return other errors unchanged so the caller can propagate them.
    fn wait(&mut self, err: std::io::Error) -> Result<(), std::io::Error> {
        match err.kind() {
            ErrorKind::Interrupted => Ok(()),
            ErrorKind::WouldBlock => {
                let delay = self.next_delay();
                std::thread::sleep(delay);
                Ok(())
            }
            _ => Err(err),
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = match self.delay {
            None => BACKOFF_MIN,
            Some(d) => std::cmp::min(d * 2, BACKOFF_MAX),
        };
        self.delay = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.delay = None;
    }
}

/// Bit length of a big-endian unsigned integer.
fn bit_length(bytes: &[u8]) -> usize {
    match bytes.iter().position(|&b| b != 0) {
        Some(i) => (bytes.len() - i - 1) * 8 + (8 - bytes[i].leading_zeros() as usize),
        None => 0,
    }
}

/// A record or handshake message handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Handshake(HandshakeMessage),
    ChangeCipherSpec(Vec<u8>),
    Alert(Alert),
    ApplicationData(Vec<u8>),
}

impl Incoming {
    /// Wrap a non-handshake record payload.
    pub(crate) fn from_record(content_type: ContentType, payload: Vec<u8>) -> Result<Self, TlsError> {
        match content_type {
            ContentType::ChangeCipherSpec => Ok(Incoming::ChangeCipherSpec(payload)),
            ContentType::Alert => Ok(Incoming::Alert(Alert::decode(&payload)?)),
            ContentType::ApplicationData => Ok(Incoming::ApplicationData(payload)),
            ContentType::Handshake => Err(TlsError::local(
                AlertDescription::InternalError,
                "handshake records are delivered per message",
            )),
        }
    }
}

/// Outcome of looking at the reassembly buffer.
pub(crate) enum Buffered {
    Message(HandshakeMessage),
    Renegotiation,
}

/// Protocol state shared by [`Connection`] and
/// [`AsyncConnection`](crate::connection_async::AsyncConnection).
pub(crate) struct ConnectionCore {
    pub(crate) config: TlsConfig,
    pub(crate) role: TlsRole,
    pub(crate) record_layer: RecordLayer,
    pub(crate) handshake_hash: HandshakeHash,
    pub(crate) handshake_buffer: HandshakeBuffer,
    pub(crate) session: SharedSession,
    pub(crate) close_state: CloseState,
    /// Raw transport bytes not yet consumed as records.
    pub(crate) read_buf: Vec<u8>,
    /// Decrypted application data not yet returned by `read`.
    pub(crate) app_data: Vec<u8>,
    pub(crate) version: Option<ProtocolVersion>,
    pub(crate) cipher_suite: Option<CipherSuite>,
    pub(crate) certificate_type: CertificateType,
    pub(crate) resumed: bool,
    /// Set while an operation runs. Still set on entry means an earlier
    /// operation was abandoned half way.
    in_flight: bool,
}

impl ConnectionCore {
    pub(crate) fn new(config: TlsConfig) -> Self {
        let session = config
            .session
            .clone()
            .unwrap_or_else(|| Session::new().into_shared());
        Self {
            role: config.role,
            record_layer: RecordLayer::new(config.max_version),
            handshake_hash: HandshakeHash::new(),
            handshake_buffer: HandshakeBuffer::new(),
            session,
            close_state: CloseState::Open,
            read_buf: Vec::new(),
            app_data: Vec::new(),
            version: None,
            cipher_suite: None,
            certificate_type: CertificateType::X509,
            resumed: false,
            in_flight: false,
            config,
        }
    }

    pub(crate) fn enter(&mut self) -> Result<(), TlsError> {
        self.ensure_usable()?;
        self.in_flight = true;
        Ok(())
    }

    /// An operation abandoned mid-flight leaves the connection failed.
    fn ensure_usable(&mut self) -> Result<(), TlsError> {
        if self.in_flight {
            debug!("connection used after an abandoned operation");
            self.close_with_error();
            return Err(TlsError::ConnectionClosed);
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.in_flight = false;
    }

    pub(crate) fn ensure_open(&mut self) -> Result<(), TlsError> {
        self.ensure_usable()?;
        if self.close_state.is_closed() {
            return Err(TlsError::ConnectionClosed);
        }
        Ok(())
    }

    pub(crate) fn clear_resumable(&self) {
        self.with_session(|s| s.set_resumable(false));
    }

    pub(crate) fn close_with_error(&mut self) {
        self.close_state.close_error();
        self.clear_resumable();
    }

    pub(crate) fn peer_role(&self) -> TlsRole {
        match self.role {
            TlsRole::Client => TlsRole::Server,
            TlsRole::Server => TlsRole::Client,
        }
    }

    pub(crate) fn codec_context(&self) -> CodecContext {
        CodecContext {
            version: self.record_layer.version(),
            cipher_suite: self.cipher_suite,
            certificate_type: self.certificate_type,
        }
    }

    fn master_secret(&self) -> Result<Vec<u8>, TlsError> {
        let session = self.session.lock().map_err(|_| {
            TlsError::local(AlertDescription::InternalError, "session lock poisoned")
        })?;
        if session.master_secret.is_empty() {
            return Err(TlsError::local(
                AlertDescription::InternalError,
                "no master secret",
            ));
        }
        Ok(session.master_secret.clone())
    }

    pub(crate) fn calc_pending_states(
        &mut self,
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<(), TlsError> {
        let suite = self.cipher_suite.ok_or_else(|| {
            TlsError::local(AlertDescription::InternalError, "no cipher suite selected")
        })?;
        let mut ms = self.master_secret()?;
        let result = self.record_layer.calc_pending_states(
            self.role,
            &ms,
            client_random,
            server_random,
            suite,
        );
        ms.zeroize();
        result
    }

    /// Finished verify_data `sender` must produce over the transcript so far.
    pub(crate) fn verify_data(&self, sender: TlsRole) -> Result<Vec<u8>, TlsError> {
        let mut ms = self.master_secret()?;
        let result = compute_verify_data(
            self.record_layer.version(),
            &self.handshake_hash,
            &ms,
            sender,
        );
        ms.zeroize();
        result
    }

    fn is_renegotiation(&self, msg_type: u8) -> bool {
        match self.role {
            TlsRole::Client => msg_type == HandshakeType::HelloRequest as u8,
            TlsRole::Server => msg_type == HandshakeType::ClientHello as u8,
        }
    }

    /// Hand out the next reassembled handshake message if one is waiting.
    ///
    /// Delivered messages enter the handshake hash. A renegotiation attempt
    /// is dropped unhashed; any other unexpected message is fatal.
    pub(crate) fn take_buffered(
        &mut self,
        expected: &[ContentType],
        expected_hs: &[HandshakeType],
    ) -> Result<Option<Buffered>, TlsError> {
        let Some(msg_type) = self.handshake_buffer.peek_type() else {
            return Ok(None);
        };
        let wanted = expected.contains(&ContentType::Handshake)
            && expected_hs.iter().any(|t| *t as u8 == msg_type);
        if wanted {
            let Some(raw) = self.handshake_buffer.pop() else {
                return Ok(None);
            };
            self.handshake_hash.append(&raw)?;
            let msg = decode_handshake(&raw, &self.codec_context())?;
            debug!(msg_type, len = raw.len(), "handshake message received");
            self.observe_handshake(&msg)?;
            return Ok(Some(Buffered::Message(msg)));
        }
        if self.is_renegotiation(msg_type) {
            self.handshake_buffer.pop();
            return Ok(Some(Buffered::Renegotiation));
        }
        Err(TlsError::local(
            AlertDescription::UnexpectedMessage,
            format!("expecting {expected_hs:?}, got handshake type {msg_type}"),
        ))
    }

    /// Accept an SSLv2-framed ClientHello. The whole record payload is
    /// hashed since it has no handshake header.
    pub(crate) fn accept_ssl2_hello(
        &mut self,
        payload: &[u8],
        expected_hs: &[HandshakeType],
    ) -> Result<HandshakeMessage, TlsError> {
        if payload.first() != Some(&(HandshakeType::ClientHello as u8)) {
            return Err(TlsError::local(
                AlertDescription::UnexpectedMessage,
                "can only handle SSLv2 ClientHello messages",
            ));
        }
        if !expected_hs.contains(&HandshakeType::ClientHello) || self.handshake_buffer.has_partial()
        {
            return Err(TlsError::local(
                AlertDescription::UnexpectedMessage,
                "unexpected SSLv2 ClientHello",
            ));
        }
        self.handshake_hash.append(payload)?;
        let hello = decode_client_hello_ssl2(&payload[1..])?;
        debug!(suites = hello.cipher_suites.len(), "SSLv2 ClientHello received");
        let msg = HandshakeMessage::ClientHello(hello);
        self.observe_handshake(&msg)?;
        Ok(msg)
    }

    /// Hold a received message against the configured limits and record
    /// what the session keeps from it.
    pub(crate) fn observe_handshake(&mut self, msg: &HandshakeMessage) -> Result<(), TlsError> {
        match (self.role, msg) {
            (TlsRole::Server, HandshakeMessage::ClientHello(hello)) => {
                if hello.version < self.config.min_version.wire() {
                    return Err(TlsError::local(
                        AlertDescription::ProtocolVersion,
                        format!("client version {:?} below minimum", hello.version),
                    ));
                }
                if let Some(name) = hello.srp_username.as_ref().filter(|n| !n.is_empty()) {
                    let name = String::from_utf8(name.clone()).map_err(|_| {
                        TlsError::local(AlertDescription::DecodeError, "SRP username is not UTF-8")
                    })?;
                    self.with_session(|s| s.srp_username = Some(name));
                }
            }
            (TlsRole::Client, HandshakeMessage::ServerHello(hello)) => {
                let version = ProtocolVersion::from_wire(hello.version.0, hello.version.1)
                    .filter(|v| self.config.accepts_version(*v))
                    .ok_or_else(|| {
                        TlsError::local(
                            AlertDescription::ProtocolVersion,
                            format!("server chose version {:?}", hello.version),
                        )
                    })?;
                if !self.config.cipher_suites.contains(&hello.cipher_suite) {
                    return Err(TlsError::local(
                        AlertDescription::IllegalParameter,
                        format!("server chose cipher suite 0x{:04x}", hello.cipher_suite.0),
                    ));
                }
                if !self.config.certificate_types.contains(&hello.certificate_type) {
                    return Err(TlsError::local(
                        AlertDescription::IllegalParameter,
                        format!("server chose certificate type {}", hello.certificate_type.0),
                    ));
                }
                debug!(version = version.name(), suite = hello.cipher_suite.0, "ServerHello accepted");
            }
            (TlsRole::Client, HandshakeMessage::ServerKeyExchange(ske)) => {
                let bits = bit_length(&ske.srp_n);
                if bits < self.config.min_key_size as usize {
                    return Err(TlsError::local(
                        AlertDescription::InsufficientSecurity,
                        format!("SRP group of {bits} bits"),
                    ));
                }
                if bits > self.config.max_key_size as usize {
                    return Err(TlsError::local(
                        AlertDescription::IllegalParameter,
                        format!("SRP group of {bits} bits"),
                    ));
                }
            }
            (role, HandshakeMessage::Certificate(cert)) => {
                let chain = cert.chain.clone();
                self.with_session(|s| match role {
                    TlsRole::Client => s.server_cert_chain = Some(chain),
                    TlsRole::Server => s.client_cert_chain = Some(chain),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn with_session(&self, f: impl FnOnce(&mut Session)) {
        match self.session.lock() {
            Ok(mut s) => f(&mut s),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    pub(crate) fn check_change_cipher_spec(&self, payload: &[u8]) -> Result<(), TlsError> {
        match payload {
            [CHANGE_CIPHER_SPEC_BYTE] => Ok(()),
            [other] => Err(TlsError::local(
                AlertDescription::IllegalParameter,
                format!("ChangeCipherSpec value {other}"),
            )),
            _ => Err(TlsError::local(
                AlertDescription::DecodeError,
                format!("ChangeCipherSpec of {} bytes", payload.len()),
            )),
        }
    }
}

/// A synchronous TLS connection.
pub struct Connection<S: Read + Write> {
    stream: S,
    core: ConnectionCore,
}

impl<S: Read + Write> Connection<S> {
    /// Wrap `stream`. Record protection starts empty; the session comes from
    /// the config or is created fresh.
    pub fn new(stream: S, config: TlsConfig) -> Self {
        Self {
            stream,
            core: ConnectionCore::new(config),
        }
    }

    fn io_read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        let mut backoff = Backoff::default();
        loop {
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) => backoff.wait(e)?,
            }
        }
    }

    fn io_write_all(&mut self, data: &[u8]) -> Result<(), TlsError> {
        let mut backoff = Backoff::default();
        let mut offset = 0;
        while offset < data.len() {
            match self.stream.write(&data[offset..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => {
                    offset += n;
                    backoff.reset();
                }
                Err(e) => backoff.wait(e)?,
            }
        }
        loop {
            match self.stream.flush() {
                Ok(()) => return Ok(()),
                Err(e) => backoff.wait(e)?,
            }
        }
    }

    fn fill_buf(&mut self, min_bytes: usize) -> Result<(), TlsError> {
        fill_buf_body!(sync, self, min_bytes)
    }

    fn read_record(&mut self) -> Result<(RecordHeader, Vec<u8>), TlsError> {
        read_record_body!(sync, self)
    }

    fn write_record(&mut self, content_type: ContentType, fragment: &[u8]) -> Result<(), TlsError> {
        write_record_body!(sync, self, content_type, fragment)
    }

    fn send_payload(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
        skip_empty: bool,
    ) -> Result<(), TlsError> {
        send_payload_body!(sync, self, content_type, payload, skip_empty)
    }

    fn send_handshake_flight(&mut self, messages: &[HandshakeMessage]) -> Result<(), TlsError> {
        send_handshake_flight_body!(sync, self, messages)
    }

    fn send_alert(&mut self, alert: Alert) -> Result<(), TlsError> {
        send_alert_body!(sync, self, alert)
    }

    fn recv_incoming(
        &mut self,
        expected: &[ContentType],
        expected_hs: &[HandshakeType],
    ) -> Result<Incoming, TlsError> {
        recv_incoming_body!(sync, self, expected, expected_hs)
    }

    fn fail(&mut self, err: TlsError) -> TlsError {
        fail_body!(sync, self, err)
    }

    fn exchange_close_notify(&mut self) -> Result<(), TlsError> {
        exchange_close_notify_body!(sync, self)
    }

    fn send_finished_flight(&mut self) -> Result<(), TlsError> {
        send_finished_flight_body!(sync, self)
    }

    fn get_finished_flight(&mut self) -> Result<(), TlsError> {
        get_finished_flight_body!(sync, self)
    }

    fn send_ccs(&mut self) -> Result<(), TlsError> {
        send_change_cipher_spec_body!(sync, self)
    }

    fn receive_ccs(&mut self) -> Result<(), TlsError> {
        receive_change_cipher_spec_body!(sync, self)
    }

    /// Send one message of any content type, fragmenting as needed.
    pub fn send_record(&mut self, content_type: ContentType, data: &[u8]) -> Result<(), TlsError> {
        send_record_body!(sync, self, content_type, data)
    }

    /// Encode, hash and send a flight of handshake messages.
    pub fn send_handshake(&mut self, messages: &[HandshakeMessage]) -> Result<(), TlsError> {
        send_handshake_body!(sync, self, messages)
    }

    /// Receive the next record of an `expected` content type; handshake
    /// records yield whole messages whose type is in `expected_hs`.
    pub fn receive(
        &mut self,
        expected: &[ContentType],
        expected_hs: &[HandshakeType],
    ) -> Result<Incoming, TlsError> {
        receive_body!(sync, self, expected, expected_hs)
    }

    /// Receive one handshake message of an expected type.
    pub fn receive_handshake(
        &mut self,
        expected_hs: &[HandshakeType],
    ) -> Result<HandshakeMessage, TlsError> {
        receive_handshake_body!(sync, self, expected_hs)
    }

    /// Send ChangeCipherSpec and activate the pending write state.
    pub fn send_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(sync, self, self.send_ccs())
    }

    /// Receive ChangeCipherSpec and activate the pending read state.
    pub fn receive_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(sync, self, self.receive_ccs())
    }

    /// ChangeCipherSpec followed by our Finished.
    pub fn send_finished(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(sync, self, self.send_finished_flight())
    }

    /// The peer's ChangeCipherSpec and Finished; a wrong verify_data is
    /// `decrypt_error`.
    pub fn get_finished(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(sync, self, self.get_finished_flight())
    }

    /// Read application data, waiting until at least `min` bytes (capped at
    /// `buf.len()`) are buffered or the connection closes.
    pub fn read_at_least(&mut self, buf: &mut [u8], min: usize) -> Result<usize, TlsError> {
        read_at_least_body!(sync, self, buf, min)
    }

    /// Exchange close_notify with the peer and close.
    pub fn close(&mut self) -> Result<(), TlsError> {
        close_body!(sync, self)
    }
}

impl_connection_accessors!(Connection, Read + Write);

impl<S: Read + Write> TlsConnection for Connection<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        self.read_at_least(buf, 1)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError> {
        write_body!(sync, self, buf)
    }

    fn shutdown(&mut self) -> Result<(), TlsError> {
        self.close()
    }

    fn version(&self) -> Option<ProtocolVersion> {
        self.core.version
    }

    fn cipher_suite(&self) -> Option<CipherSuite> {
        self.core.cipher_suite
    }
}

#[cfg(test)]
mod tests;
