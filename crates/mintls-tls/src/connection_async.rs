//! Asynchronous connection over a tokio `AsyncRead + AsyncWrite` transport.
//!
//! Runs the same record-level logic as [`Connection`](crate::connection::Connection);
//! every transport read or write is an `.await` point. Dropping one of the
//! returned futures before it completes leaves the connection unusable: the
//! next call fails with `ConnectionClosed`.

use subtle::ConstantTimeEq;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::alert::{Alert, AlertDescription, AlertDisposition, CloseState};
use crate::config::TlsConfig;
use crate::connection::{Buffered, ConnectionCore, Incoming, CHANGE_CIPHER_SPEC_BYTE};
use crate::crypt::transcript::HandshakeHash;
use crate::crypt::CipherSuiteParams;
use crate::handshake::codec::{encode_handshake, Finished};
use crate::handshake::{CertificateType, HandshakeMessage, HandshakeType};
use crate::record::{ContentType, RecordHeader, RecordLayer};
use crate::session::SharedSession;
use crate::{AsyncTlsConnection, CipherSuite, ProtocolVersion, TlsError, TlsRole};

/// An asynchronous TLS connection.
pub struct AsyncConnection<S: AsyncRead + AsyncWrite + Unpin> {
    stream: S,
    core: ConnectionCore,
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncConnection<S> {
    /// Wrap `stream`. Record protection starts empty; the session comes from
    /// the config or is created fresh.
    pub fn new(stream: S, config: TlsConfig) -> Self {
        Self {
            stream,
            core: ConnectionCore::new(config),
        }
    }

    async fn io_read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        Ok(self.stream.read(buf).await?)
    }

    async fn io_write_all(&mut self, data: &[u8]) -> Result<(), TlsError> {
        self.stream.write_all(data).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn fill_buf(&mut self, min_bytes: usize) -> Result<(), TlsError> {
        fill_buf_body!(is_async, self, min_bytes)
    }

    async fn read_record(&mut self) -> Result<(RecordHeader, Vec<u8>), TlsError> {
        read_record_body!(is_async, self)
    }

    async fn write_record(
        &mut self,
        content_type: ContentType,
        fragment: &[u8],
    ) -> Result<(), TlsError> {
        write_record_body!(is_async, self, content_type, fragment)
    }

    async fn send_payload(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
        skip_empty: bool,
    ) -> Result<(), TlsError> {
        send_payload_body!(is_async, self, content_type, payload, skip_empty)
    }

    async fn send_handshake_flight(
        &mut self,
        messages: &[HandshakeMessage],
    ) -> Result<(), TlsError> {
        send_handshake_flight_body!(is_async, self, messages)
    }

    async fn send_alert(&mut self, alert: Alert) -> Result<(), TlsError> {
        send_alert_body!(is_async, self, alert)
    }

    async fn recv_incoming(
        &mut self,
        expected: &[ContentType],
        expected_hs: &[HandshakeType],
    ) -> Result<Incoming, TlsError> {
        recv_incoming_body!(is_async, self, expected, expected_hs)
    }

    async fn fail(&mut self, err: TlsError) -> TlsError {
        fail_body!(is_async, self, err)
    }

    async fn exchange_close_notify(&mut self) -> Result<(), TlsError> {
        exchange_close_notify_body!(is_async, self)
    }

    async fn send_finished_flight(&mut self) -> Result<(), TlsError> {
        send_finished_flight_body!(is_async, self)
    }

    async fn get_finished_flight(&mut self) -> Result<(), TlsError> {
        get_finished_flight_body!(is_async, self)
    }

    async fn send_ccs(&mut self) -> Result<(), TlsError> {
        send_change_cipher_spec_body!(is_async, self)
    }

    async fn receive_ccs(&mut self) -> Result<(), TlsError> {
        receive_change_cipher_spec_body!(is_async, self)
    }

    /// Send one message of any content type, fragmenting as needed.
    pub async fn send_record(
        &mut self,
        content_type: ContentType,
        data: &[u8],
    ) -> Result<(), TlsError> {
        send_record_body!(is_async, self, content_type, data)
    }

    /// Encode, hash and send a flight of handshake messages.
    pub async fn send_handshake(&mut self, messages: &[HandshakeMessage]) -> Result<(), TlsError> {
        send_handshake_body!(is_async, self, messages)
    }

    /// Receive the next record of an `expected` content type; handshake
    /// records yield whole messages whose type is in `expected_hs`.
    pub async fn receive(
        &mut self,
        expected: &[ContentType],
        expected_hs: &[HandshakeType],
    ) -> Result<Incoming, TlsError> {
        receive_body!(is_async, self, expected, expected_hs)
    }

    /// Receive one handshake message of an expected type.
    pub async fn receive_handshake(
        &mut self,
        expected_hs: &[HandshakeType],
    ) -> Result<HandshakeMessage, TlsError> {
        receive_handshake_body!(is_async, self, expected_hs)
    }

    /// Send ChangeCipherSpec and activate the pending write state.
    pub async fn send_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(is_async, self, self.send_ccs())
    }

    /// Receive ChangeCipherSpec and activate the pending read state.
    pub async fn receive_change_cipher_spec(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(is_async, self, self.receive_ccs())
    }

    /// ChangeCipherSpec followed by our Finished.
    pub async fn send_finished(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(is_async, self, self.send_finished_flight())
    }

    /// The peer's ChangeCipherSpec and Finished.
    pub async fn get_finished(&mut self) -> Result<(), TlsError> {
        self.core.ensure_open()?;
        guarded_body!(is_async, self, self.get_finished_flight())
    }

    /// Read application data, waiting until at least `min` bytes (capped at
    /// `buf.len()`) are buffered or the connection closes.
    pub async fn read_at_least(&mut self, buf: &mut [u8], min: usize) -> Result<usize, TlsError> {
        read_at_least_body!(is_async, self, buf, min)
    }

    /// Exchange close_notify with the peer and close.
    pub async fn close(&mut self) -> Result<(), TlsError> {
        close_body!(is_async, self)
    }
}

impl_connection_accessors!(AsyncConnection, AsyncRead + AsyncWrite + Unpin);

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncTlsConnection for AsyncConnection<S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsError> {
        self.read_at_least(buf, 1).await
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, TlsError> {
        write_body!(is_async, self, buf)
    }

    async fn shutdown(&mut self) -> Result<(), TlsError> {
        self.close().await
    }

    fn version(&self) -> Option<ProtocolVersion> {
        self.core.version
    }

    fn cipher_suite(&self) -> Option<CipherSuite> {
        self.core.cipher_suite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use tokio::io::DuplexStream;

    const CLIENT_RANDOM: [u8; 32] = [0xC1; 32];
    const SERVER_RANDOM: [u8; 32] = [0x5E; 32];

    fn make_config(role: TlsRole) -> TlsConfig {
        let mut session = Session::new();
        session.master_secret = (0..48).collect();
        session.session_id = vec![0xAA; 32];
        session.set_resumable(true);
        TlsConfig::builder()
            .role(role)
            .session(session.into_shared())
            .build()
            .unwrap()
    }

    fn make_pair(
        version: ProtocolVersion,
        suite: CipherSuite,
    ) -> (AsyncConnection<DuplexStream>, AsyncConnection<DuplexStream>) {
        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        let mut client = AsyncConnection::new(client_stream, make_config(TlsRole::Client));
        let mut server = AsyncConnection::new(server_stream, make_config(TlsRole::Server));
        for conn in [&mut client, &mut server] {
            conn.set_version(version);
            conn.set_cipher_suite(suite);
            conn.calc_pending_states(&CLIENT_RANDOM, &SERVER_RANDOM)
                .unwrap();
        }
        (client, server)
    }

    async fn establish(
        client: &mut AsyncConnection<DuplexStream>,
        server: &mut AsyncConnection<DuplexStream>,
    ) {
        let (c_res, s_res) = tokio::join!(client.send_finished(), server.get_finished());
        c_res.unwrap();
        s_res.unwrap();
        let (s_res, c_res) = tokio::join!(server.send_finished(), client.get_finished());
        s_res.unwrap();
        c_res.unwrap();
    }

    #[tokio::test]
    async fn test_async_new_connection_state() {
        let (client_stream, _server_stream) = tokio::io::duplex(16 * 1024);
        let conn = AsyncConnection::new(client_stream, make_config(TlsRole::Client));
        assert_eq!(conn.version(), None);
        assert_eq!(conn.cipher_suite(), None);
        assert!(!conn.is_closed());
        assert!(!conn.record_layer().write_state().is_protected());
    }

    #[tokio::test]
    async fn test_async_finished_and_data() {
        let suite = CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA;
        let (mut client, mut server) = make_pair(ProtocolVersion::Tls10, suite);
        establish(&mut client, &mut server).await;

        assert_eq!(client.version(), Some(ProtocolVersion::Tls10));
        assert_eq!(server.cipher_suite(), Some(suite));

        let msg = b"Hello from client";
        client.write(msg).await.unwrap();
        let mut buf = [0u8; 256];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], msg);

        let reply = b"Hello from server";
        server.write(reply).await.unwrap();
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], reply);
    }

    #[tokio::test]
    async fn test_async_large_write() {
        let (mut client, mut server) =
            make_pair(ProtocolVersion::Tls11, CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA);
        establish(&mut client, &mut server).await;

        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let mut buf = vec![0u8; data.len()];
        let (w, r) = tokio::join!(
            client.write(&data),
            server.read_at_least(&mut buf, data.len())
        );
        assert_eq!(w.unwrap(), data.len());
        assert_eq!(r.unwrap(), data.len());
        assert_eq!(buf, data);
    }

    #[tokio::test]
    async fn test_async_close_notify_exchange() {
        let (mut client, mut server) =
            make_pair(ProtocolVersion::Ssl30, CipherSuite::TLS_RSA_WITH_RC4_128_SHA);
        establish(&mut client, &mut server).await;

        let mut buf = [0u8; 16];
        let (c_res, s_res) = tokio::join!(client.shutdown(), server.read(&mut buf));
        c_res.unwrap();
        assert_eq!(s_res.unwrap(), 0);
        assert_eq!(client.close_state(), CloseState::ClosedClean);
        assert_eq!(server.close_state(), CloseState::ClosedClean);
        assert!(client.session().lock().unwrap().resumable);
        assert!(server.session().lock().unwrap().resumable);
    }

    #[tokio::test]
    async fn test_async_abrupt_close() {
        let (client_stream, server_stream) = tokio::io::duplex(1024);
        let mut server = AsyncConnection::new(server_stream, make_config(TlsRole::Server));
        drop(client_stream);

        let mut buf = [0u8; 16];
        assert!(matches!(
            server.read(&mut buf).await,
            Err(TlsError::AbruptClose)
        ));
        assert_eq!(server.close_state(), CloseState::ClosedError);
        assert!(!server.session().lock().unwrap().resumable);
    }

    #[tokio::test]
    async fn test_async_abandoned_read_poisons_connection() {
        let (_client_stream, server_stream) = tokio::io::duplex(1024);
        let mut server = AsyncConnection::new(server_stream, make_config(TlsRole::Server));

        let mut buf = [0u8; 16];
        tokio::select! {
            biased;
            _ = server.read(&mut buf) => panic!("read completed without data"),
            _ = std::future::ready(()) => {}
        }

        assert!(matches!(
            server.read(&mut buf).await,
            Err(TlsError::ConnectionClosed)
        ));
        assert!(server.is_closed());
    }

    #[tokio::test]
    async fn test_async_write_after_abandoned_read_closes() {
        let (_client_stream, server_stream) = tokio::io::duplex(1024);
        let mut server = AsyncConnection::new(server_stream, make_config(TlsRole::Server));

        let mut buf = [0u8; 16];
        tokio::select! {
            biased;
            _ = server.read(&mut buf) => panic!("read completed without data"),
            _ = std::future::ready(()) => {}
        }
        assert!(!server.is_closed());

        assert!(matches!(
            server.write(b"late").await,
            Err(TlsError::ConnectionClosed)
        ));
        assert_eq!(server.close_state(), CloseState::ClosedError);
        assert!(!server.session().lock().unwrap().resumable);
    }

    #[tokio::test]
    async fn test_async_handshake_messages() {
        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);
        let mut client = AsyncConnection::new(client_stream, make_config(TlsRole::Client));
        let mut server = AsyncConnection::new(server_stream, make_config(TlsRole::Server));

        server
            .send_handshake(&[HandshakeMessage::ServerHelloDone])
            .await
            .unwrap();
        let msg = client
            .receive_handshake(&[HandshakeType::ServerHelloDone])
            .await
            .unwrap();
        assert_eq!(msg, HandshakeMessage::ServerHelloDone);
        assert_eq!(
            client.handshake_hash().finished_hash().unwrap(),
            server.handshake_hash().finished_hash().unwrap()
        );
    }
}
