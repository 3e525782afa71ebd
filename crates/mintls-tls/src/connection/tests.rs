use super::*;
use crate::alert::AlertLevel;
use crate::handshake::codec::{
    CertificateChain, CertificateMsg, ClientHello, ServerHello, ServerKeyExchange,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

const CLIENT_RANDOM: [u8; 32] = [1; 32];
const SERVER_RANDOM: [u8; 32] = [2; 32];

/// One direction of an in-memory transport.
#[derive(Clone, Default)]
struct Wire(Rc<RefCell<VecDeque<u8>>>);

impl Wire {
    fn push(&self, bytes: &[u8]) {
        self.0.borrow_mut().extend(bytes.iter().copied());
    }

    fn len(&self) -> usize {
        self.0.borrow().len()
    }

    fn flip_last_byte(&self) {
        let mut q = self.0.borrow_mut();
        let last = q.len() - 1;
        q[last] ^= 0x01;
    }

    /// `(content type, body length)` of every queued record.
    fn records(&self) -> Vec<(u8, usize)> {
        let bytes: Vec<u8> = self.0.borrow().iter().copied().collect();
        let mut out = Vec::new();
        let mut pos = 0;
        while pos + 5 <= bytes.len() {
            let len = usize::from(u16::from_be_bytes([bytes[pos + 3], bytes[pos + 4]]));
            out.push((bytes[pos], len));
            pos += 5 + len;
        }
        out
    }
}

/// In-memory transport; an empty receive queue reads as EOF.
struct MemPipe {
    rx: Wire,
    tx: Wire,
}

impl Read for MemPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut q = self.rx.0.borrow_mut();
        let n = buf.len().min(q.len());
        for (dst, src) in buf.iter_mut().zip(q.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl Write for MemPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Transport that moves at most 7 bytes per call and fails two calls out of
/// three with `Interrupted` / `WouldBlock`.
struct Flaky<S> {
    inner: S,
    calls: usize,
}

impl<S> Flaky<S> {
    fn new(inner: S) -> Self {
        Self { inner, calls: 0 }
    }

    fn tick(&mut self) -> io::Result<()> {
        self.calls += 1;
        match self.calls % 3 {
            0 => Err(io::ErrorKind::WouldBlock.into()),
            1 => Err(io::ErrorKind::Interrupted.into()),
            _ => Ok(()),
        }
    }
}

impl<S: Read> Read for Flaky<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.tick()?;
        let n = buf.len().min(7);
        self.inner.read(&mut buf[..n])
    }
}

impl<S: Write> Write for Flaky<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tick()?;
        let n = buf.len().min(7);
        self.inner.write(&buf[..n])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tick()?;
        self.inner.flush()
    }
}

/// Reads pass through; every write fails with `BrokenPipe`.
struct ReadOnly<S>(S);

impl<S: Read> Read for ReadOnly<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<S> Write for ReadOnly<S> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Returns `(client end, server end, client->server wire, server->client wire)`.
fn pipe() -> (MemPipe, MemPipe, Wire, Wire) {
    let c2s = Wire::default();
    let s2c = Wire::default();
    let client = MemPipe {
        rx: s2c.clone(),
        tx: c2s.clone(),
    };
    let server = MemPipe {
        rx: c2s.clone(),
        tx: s2c.clone(),
    };
    (client, server, c2s, s2c)
}

fn resumable_session() -> SharedSession {
    let mut s = Session::new();
    s.master_secret = vec![0x42; 48];
    s.session_id = vec![9; 32];
    s.set_resumable(true);
    s.into_shared()
}

fn is_resumable<S: Read + Write>(conn: &Connection<S>) -> bool {
    conn.session().lock().unwrap().resumable
}

fn plain<S: Read + Write>(stream: S, role: TlsRole) -> Connection<S> {
    let config = TlsConfig::builder()
        .role(role)
        .session(resumable_session())
        .build()
        .unwrap();
    Connection::new(stream, config)
}

fn keyed<S: Read + Write>(
    stream: S,
    role: TlsRole,
    version: ProtocolVersion,
    suite: CipherSuite,
) -> Connection<S> {
    let mut conn = plain(stream, role);
    conn.set_version(version);
    conn.set_cipher_suite(suite);
    conn.calc_pending_states(&CLIENT_RANDOM, &SERVER_RANDOM)
        .unwrap();
    conn
}

fn keyed_pair(
    version: ProtocolVersion,
    suite: CipherSuite,
) -> (Connection<MemPipe>, Connection<MemPipe>, Wire, Wire) {
    let (c, s, c2s, s2c) = pipe();
    (
        keyed(c, TlsRole::Client, version, suite),
        keyed(s, TlsRole::Server, version, suite),
        c2s,
        s2c,
    )
}

fn finish_handshake<S: Read + Write>(client: &mut Connection<S>, server: &mut Connection<S>) {
    client.send_finished().unwrap();
    server.get_finished().unwrap();
    server.send_finished().unwrap();
    client.get_finished().unwrap();
}

fn established(
    version: ProtocolVersion,
    suite: CipherSuite,
) -> (Connection<MemPipe>, Connection<MemPipe>, Wire, Wire) {
    let (mut client, mut server, c2s, s2c) = keyed_pair(version, suite);
    finish_handshake(&mut client, &mut server);
    assert_eq!(c2s.len(), 0);
    assert_eq!(s2c.len(), 0);
    (client, server, c2s, s2c)
}

fn expect_alert(conn: &mut Connection<MemPipe>) -> Alert {
    match conn.receive(&[ContentType::Alert], &[]).unwrap() {
        Incoming::Alert(alert) => alert,
        other => panic!("expected alert, got {other:?}"),
    }
}

#[test]
fn test_finished_exchange_and_data_all_versions() {
    for version in [
        ProtocolVersion::Ssl30,
        ProtocolVersion::Tls10,
        ProtocolVersion::Tls11,
    ] {
        for suite in [
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
            CipherSuite::TLS_SRP_SHA_WITH_AES_256_CBC_SHA,
            CipherSuite::TLS_RSA_WITH_3DES_EDE_CBC_SHA,
            CipherSuite::TLS_RSA_WITH_RC4_128_SHA,
        ] {
            let (mut client, mut server, _, _) = established(version, suite);
            assert_eq!(client.version(), Some(version));
            assert_eq!(server.cipher_suite(), Some(suite));

            client.write(b"ping").unwrap();
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"ping");

            server.write(b"pong").unwrap();
            let n = client.read(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"pong");
        }
    }
}

#[test]
fn test_sequence_numbers_after_change_cipher_spec() {
    let (mut client, mut server, _, _) = keyed_pair(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client.send_change_cipher_spec().unwrap();
    server.receive_change_cipher_spec().unwrap();
    assert_eq!(server.record_layer().read_state().sequence_number(), 0);

    let mut buf = [0u8; 32];
    for expected_seq in 0..3u8 {
        assert_eq!(
            server.record_layer().read_state().sequence_number(),
            u64::from(expected_seq)
        );
        client.write(&[expected_seq; 10]).unwrap();
        let n = server.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[expected_seq; 10]);
    }
    assert_eq!(server.record_layer().read_state().sequence_number(), 3);
    assert_eq!(client.record_layer().write_state().sequence_number(), 3);
}

#[test]
fn test_large_write_is_fragmented() {
    let data: Vec<u8> = (0..50_000u32).map(|i| i as u8).collect();

    let (mut client, mut server, c2s, _) = established(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    assert_eq!(client.write(&data).unwrap(), data.len());
    let records = c2s.records();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|(ct, _)| *ct == 23));

    let mut buf = vec![0u8; data.len()];
    let n = server.read_at_least(&mut buf, data.len()).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(buf, data);

    // TLS 1.0 CBC puts one empty record in front of the whole write.
    let (mut client, mut server, c2s, _) = established(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client.write(&data).unwrap();
    let records = c2s.records();
    assert_eq!(records.len(), 5);
    assert_eq!(records[0], (23, 32));
    let n = server.read_at_least(&mut buf, data.len()).unwrap();
    assert_eq!(n, data.len());
    assert_eq!(buf, data);
}

#[test]
fn test_empty_fragment_only_before_first_message_of_flight() {
    let done = HandshakeMessage::ServerHelloDone;

    let (mut client, _server, c2s, _) = keyed_pair(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client.send_change_cipher_spec().unwrap();
    client.send_handshake(&[done.clone(), done.clone()]).unwrap();
    let types: Vec<u8> = c2s.records().iter().map(|(ct, _)| *ct).collect();
    assert_eq!(types, vec![20, 23, 22, 22]);

    let (mut client, _server, c2s, _) = keyed_pair(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client.send_change_cipher_spec().unwrap();
    client.send_handshake(&[done.clone(), done.clone()]).unwrap();
    let types: Vec<u8> = c2s.records().iter().map(|(ct, _)| *ct).collect();
    assert_eq!(types, vec![20, 22, 22]);

    let (mut client, _server, c2s, _) = keyed_pair(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_RC4_128_SHA,
    );
    client.send_change_cipher_spec().unwrap();
    client.send_handshake(&[done]).unwrap();
    let types: Vec<u8> = c2s.records().iter().map(|(ct, _)| *ct).collect();
    assert_eq!(types, vec![20, 22]);
}

#[test]
fn test_close_notify_is_echoed() {
    let (mut client, mut server, _, _) = established(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client
        .send_record(ContentType::Alert, &Alert::close_notify().encode())
        .unwrap();

    let mut buf = [0u8; 16];
    assert_eq!(server.read(&mut buf).unwrap(), 0);
    assert_eq!(server.close_state(), CloseState::ClosedClean);
    assert!(is_resumable(&server));
    assert_eq!(expect_alert(&mut client), Alert::close_notify());

    assert_eq!(server.read(&mut buf).unwrap(), 0);
    assert!(matches!(server.write(b"late"), Err(TlsError::ConnectionClosed)));
    assert!(server.close().is_ok());
}

#[test]
fn test_close_waits_for_peer_close_notify() {
    let (mut client, mut server, _, _) = established(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
    );
    server.write(b"discarded").unwrap();
    server
        .send_record(ContentType::Alert, &Alert::close_notify().encode())
        .unwrap();

    client.close().unwrap();
    assert_eq!(client.close_state(), CloseState::ClosedClean);
    assert!(is_resumable(&client));

    let mut buf = [0u8; 16];
    assert_eq!(server.read(&mut buf).unwrap(), 0);
    assert_eq!(server.close_state(), CloseState::ClosedClean);
}

#[test]
fn test_close_tolerates_vanished_peer() {
    let (c, _s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    client.shutdown().unwrap();
    assert_eq!(client.close_state(), CloseState::ClosedClean);
    assert!(is_resumable(&client));
}

#[test]
fn test_abrupt_close_is_error() {
    let (_c, s, _, _) = pipe();
    let mut server = plain(s, TlsRole::Server);
    let mut buf = [0u8; 8];
    assert!(matches!(server.read(&mut buf), Err(TlsError::AbruptClose)));
    assert_eq!(server.close_state(), CloseState::ClosedError);
    assert!(!is_resumable(&server));
    assert!(matches!(
        server.read(&mut buf),
        Err(TlsError::ConnectionClosed)
    ));
}

#[test]
fn test_abrupt_close_ignored_when_configured() {
    let (_c, s, _, _) = pipe();
    let config = TlsConfig::builder()
        .role(TlsRole::Server)
        .ignore_abrupt_close(true)
        .session(resumable_session())
        .build()
        .unwrap();
    let mut server = Connection::new(s, config);
    let mut buf = [0u8; 8];
    assert_eq!(server.read(&mut buf).unwrap(), 0);
    assert_eq!(server.close_state(), CloseState::ClosedClean);
    assert!(is_resumable(&server));
}

#[test]
fn test_warning_alert_is_absorbed() {
    let (mut client, mut server, _, _) = established(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client
        .send_record(
            ContentType::Alert,
            &Alert::warning(AlertDescription::UserCanceled).encode(),
        )
        .unwrap();
    client.write(b"after").unwrap();

    let mut buf = [0u8; 16];
    let n = server.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"after");
    assert!(!server.is_closed());
    assert!(!is_resumable(&server));
    assert_eq!(expect_alert(&mut client), Alert::close_notify());
}

#[test]
fn test_zero_fragment_size_writes_one_byte_records() {
    let (c, s, c2s, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    client.record_layer_mut().set_max_fragment_size(0);

    assert_eq!(client.write(b"abc").unwrap(), 3);
    assert_eq!(c2s.records(), vec![(23, 1), (23, 1), (23, 1)]);

    let mut buf = [0u8; 8];
    assert_eq!(server.read_at_least(&mut buf, 3).unwrap(), 3);
    assert_eq!(&buf[..3], b"abc");
}

#[test]
fn test_unknown_warning_alert_is_absorbed() {
    let (mut client, mut server, _, _) = established(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_AES_256_CBC_SHA,
    );
    // unrecognized_name has no variant of its own here
    client.send_record(ContentType::Alert, &[1, 112]).unwrap();
    client.write(b"after").unwrap();

    let mut buf = [0u8; 16];
    let n = server.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"after");
    assert!(!server.is_closed());
    assert!(!is_resumable(&server));
    assert_eq!(expect_alert(&mut client), Alert::close_notify());
}

#[test]
fn test_warning_absorbed_when_reply_cannot_be_sent() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(ReadOnly(s), TlsRole::Server);
    client
        .send_record(
            ContentType::Alert,
            &Alert::warning(AlertDescription::UserCanceled).encode(),
        )
        .unwrap();
    client.write(b"still here").unwrap();

    let mut buf = [0u8; 16];
    let n = server.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"still here");
    assert!(!server.is_closed());
}

#[test]
fn test_would_block_backoff_grows_and_resets() {
    let mut backoff = Backoff::default();
    let delays: Vec<Duration> = (0..10).map(|_| backoff.next_delay()).collect();
    assert_eq!(delays[0], BACKOFF_MIN);
    assert_eq!(delays[1], BACKOFF_MIN * 2);
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*delays.last().unwrap(), BACKOFF_MAX);

    backoff.reset();
    assert_eq!(backoff.next_delay(), BACKOFF_MIN);

    assert!(backoff.wait(io::ErrorKind::Interrupted.into()).is_ok());
    assert!(backoff.wait(io::ErrorKind::WouldBlock.into()).is_ok());
    let err = backoff.wait(io::ErrorKind::BrokenPipe.into()).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
}

#[test]
fn test_unknown_fatal_alert_closes_with_error() {
    let (mut client, mut server, _, s2c) = established(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_RC4_128_SHA,
    );
    client.send_record(ContentType::Alert, &[2, 110]).unwrap();

    let mut buf = [0u8; 16];
    let err = server.read(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        TlsError::RemoteAlert {
            level: AlertLevel::Fatal,
            description: AlertDescription::Unknown(110)
        }
    ));
    assert_eq!(server.close_state(), CloseState::ClosedError);
    assert_eq!(s2c.len(), 0);
}

#[test]
fn test_fatal_alert_closes_with_error() {
    let (mut client, mut server, _, s2c) = established(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_3DES_EDE_CBC_SHA,
    );
    client
        .send_record(
            ContentType::Alert,
            &Alert::fatal(AlertDescription::HandshakeFailure).encode(),
        )
        .unwrap();

    let mut buf = [0u8; 16];
    let err = server.read(&mut buf).unwrap_err();
    assert!(matches!(
        err,
        TlsError::RemoteAlert {
            level: AlertLevel::Fatal,
            description: AlertDescription::HandshakeFailure
        }
    ));
    assert_eq!(server.close_state(), CloseState::ClosedError);
    assert!(!is_resumable(&server));
    assert_eq!(s2c.len(), 0);
}

#[test]
fn test_server_refuses_renegotiation() {
    let (mut client, mut server, _, _) = established(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    let hello = ClientHello::new(
        (3, 2),
        [7; 32],
        Vec::new(),
        vec![CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA],
    );
    client
        .send_handshake(&[HandshakeMessage::ClientHello(hello)])
        .unwrap();
    client.write(b"data").unwrap();

    let mut buf = [0u8; 16];
    let n = server.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"data");
    assert!(!server.is_closed());
    assert_eq!(
        expect_alert(&mut client),
        Alert::warning(AlertDescription::NoRenegotiation)
    );
}

#[test]
fn test_client_refuses_hello_request() {
    let (mut client, mut server, _, _) = established(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_RC4_128_SHA,
    );
    server
        .send_record(ContentType::Handshake, &[0, 0, 0, 0])
        .unwrap();
    server.write(b"x").unwrap();

    let mut buf = [0u8; 4];
    let n = client.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"x");
    assert_eq!(
        expect_alert(&mut server),
        Alert::warning(AlertDescription::NoRenegotiation)
    );
}

#[test]
fn test_handshake_message_spanning_records() {
    let (c, s, c2s, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    let cert = HandshakeMessage::Certificate(CertificateMsg {
        chain: CertificateChain::X509(vec![vec![0xAB; 20_000]]),
    });

    client.send_handshake(&[cert.clone()]).unwrap();
    assert_eq!(c2s.records().len(), 2);

    let got = server
        .receive_handshake(&[HandshakeType::Certificate])
        .unwrap();
    assert_eq!(got, cert);
    assert_eq!(
        client.handshake_hash().finished_hash().unwrap(),
        server.handshake_hash().finished_hash().unwrap()
    );
    let session = server.session();
    let session = session.lock().unwrap();
    assert_eq!(
        session.client_cert_chain,
        Some(CertificateChain::X509(vec![vec![0xAB; 20_000]]))
    );
    assert!(session.server_cert_chain.is_none());
}

fn configured<S: Read + Write>(stream: S, builder: crate::config::TlsConfigBuilder) -> Connection<S> {
    Connection::new(stream, builder.session(resumable_session()).build().unwrap())
}

fn server_hello(version: (u8, u8), suite: CipherSuite) -> HandshakeMessage {
    HandshakeMessage::ServerHello(ServerHello {
        version,
        random: SERVER_RANDOM,
        session_id: vec![9; 32],
        cipher_suite: suite,
        compression_method: 0,
        certificate_type: CertificateType::X509,
    })
}

#[test]
fn test_server_hello_checked_against_config() {
    let cases = [
        ((3, 2), CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA, AlertDescription::ProtocolVersion),
        ((3, 3), CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA, AlertDescription::ProtocolVersion),
        ((3, 1), CipherSuite::TLS_RSA_WITH_RC4_128_SHA, AlertDescription::IllegalParameter),
    ];
    for (version, suite, description) in cases {
        let (c, s, _, _) = pipe();
        let mut client = configured(
            c,
            TlsConfig::builder()
                .max_version(ProtocolVersion::Tls10)
                .cipher_suites(&[CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA]),
        );
        let mut server = plain(s, TlsRole::Server);
        server.send_handshake(&[server_hello(version, suite)]).unwrap();

        let err = client
            .receive_handshake(&[HandshakeType::ServerHello])
            .unwrap_err();
        assert_eq!(err.alert_description(), Some(description));
        assert_eq!(client.close_state(), CloseState::ClosedError);
        assert_eq!(expect_alert(&mut server), Alert::fatal(description));
    }
}

#[test]
fn test_server_hello_within_config_accepted() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    let hello = server_hello((3, 0), CipherSuite::TLS_SRP_SHA_WITH_AES_256_CBC_SHA);
    server.send_handshake(&[hello.clone()]).unwrap();
    assert_eq!(
        client.receive_handshake(&[HandshakeType::ServerHello]).unwrap(),
        hello
    );
}

#[test]
fn test_client_hello_below_minimum_version() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = configured(
        s,
        TlsConfig::builder()
            .role(TlsRole::Server)
            .min_version(ProtocolVersion::Tls10),
    );
    let hello = ClientHello::new((3, 0), CLIENT_RANDOM, Vec::new(), vec![CipherSuite(0x002F)]);
    client
        .send_handshake(&[HandshakeMessage::ClientHello(hello)])
        .unwrap();

    let err = server
        .receive_handshake(&[HandshakeType::ClientHello])
        .unwrap_err();
    assert_eq!(err.alert_description(), Some(AlertDescription::ProtocolVersion));
}

#[test]
fn test_client_hello_srp_username_kept_in_session() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    let mut hello = ClientHello::new((3, 1), CLIENT_RANDOM, Vec::new(), vec![CipherSuite(0x0053)]);
    hello.srp_username = Some(b"alice".to_vec());
    client
        .send_handshake(&[HandshakeMessage::ClientHello(hello)])
        .unwrap();

    server
        .receive_handshake(&[HandshakeType::ClientHello])
        .unwrap();
    assert_eq!(
        server.session().lock().unwrap().srp_username.as_deref(),
        Some("alice")
    );
}

#[test]
fn test_srp_group_size_limits() {
    // (modulus bytes, outcome)
    let cases = [
        (64, Some(AlertDescription::InsufficientSecurity)),
        (128, None),
        (1026, Some(AlertDescription::IllegalParameter)),
    ];
    for (len, outcome) in cases {
        let (c, s, _, _) = pipe();
        let mut client = plain(c, TlsRole::Client);
        let mut server = plain(s, TlsRole::Server);
        let suite = CipherSuite::TLS_SRP_SHA_WITH_AES_128_CBC_SHA;
        client.set_cipher_suite(suite);
        server.set_cipher_suite(suite);

        let ske = ServerKeyExchange::srp(&vec![0xFF; len], &[2], &[0x5A; 16], &[0x77; 64]);
        server
            .send_handshake(&[HandshakeMessage::ServerKeyExchange(ske)])
            .unwrap();
        let result = client.receive_handshake(&[HandshakeType::ServerKeyExchange]);
        match outcome {
            None => assert!(result.is_ok()),
            Some(description) => {
                assert_eq!(result.unwrap_err().alert_description(), Some(description));
                assert!(client.is_closed());
            }
        }
    }
}

#[test]
fn test_bit_length() {
    assert_eq!(bit_length(&[]), 0);
    assert_eq!(bit_length(&[0, 0]), 0);
    assert_eq!(bit_length(&[0x01]), 1);
    assert_eq!(bit_length(&[0x00, 0x80, 0x00]), 16);
    assert_eq!(bit_length(&[0xFF; 128]), 1024);
}

#[test]
fn test_several_messages_in_one_record() {
    let (c, s, _, s2c) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    server
        .send_record(ContentType::Handshake, &[14, 0, 0, 0, 14, 0, 0, 0])
        .unwrap();
    assert_eq!(s2c.records().len(), 1);

    for _ in 0..2 {
        let msg = client
            .receive_handshake(&[HandshakeType::ServerHelloDone])
            .unwrap();
        assert_eq!(msg, HandshakeMessage::ServerHelloDone);
    }
    assert_eq!(
        client.handshake_hash().finished_hash().unwrap(),
        server.handshake_hash().finished_hash().unwrap()
    );
}

#[test]
fn test_unexpected_handshake_type_is_fatal() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    server
        .send_handshake(&[HandshakeMessage::ServerHelloDone])
        .unwrap();

    let err = client
        .receive_handshake(&[HandshakeType::ServerHello])
        .unwrap_err();
    assert_eq!(
        err.alert_description(),
        Some(AlertDescription::UnexpectedMessage)
    );
    assert_eq!(client.close_state(), CloseState::ClosedError);
    assert!(!is_resumable(&client));
    assert_eq!(
        expect_alert(&mut server),
        Alert::fatal(AlertDescription::UnexpectedMessage)
    );
}

#[test]
fn test_unexpected_content_type_is_fatal() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    client.write(b"early").unwrap();
    let err = server
        .receive_handshake(&[HandshakeType::ClientHello])
        .unwrap_err();
    assert_eq!(
        err.alert_description(),
        Some(AlertDescription::UnexpectedMessage)
    );
}

#[test]
fn test_empty_handshake_record_is_decode_error() {
    let (c, s, _, _) = pipe();
    let mut client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    client.send_record(ContentType::Handshake, &[]).unwrap();
    let err = server
        .receive_handshake(&[HandshakeType::ClientHello])
        .unwrap_err();
    assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
}

#[test]
fn test_bad_change_cipher_spec() {
    for (payload, alert) in [
        (&[2u8][..], AlertDescription::IllegalParameter),
        (&[1u8, 1][..], AlertDescription::DecodeError),
    ] {
        let (mut client, mut server, _, _) = keyed_pair(
            ProtocolVersion::Tls10,
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
        );
        client
            .send_record(ContentType::ChangeCipherSpec, payload)
            .unwrap();
        let err = server.receive_change_cipher_spec().unwrap_err();
        assert_eq!(err.alert_description(), Some(alert));
        assert_eq!(expect_alert(&mut client), Alert::fatal(alert));
    }
}

#[test]
fn test_finished_mismatch_is_decrypt_error() {
    let (mut client, mut server, _, _) = keyed_pair(
        ProtocolVersion::Tls10,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client.core.handshake_hash.append(b"divergent").unwrap();
    client.send_finished().unwrap();

    let err = server.get_finished().unwrap_err();
    assert_eq!(err.alert_description(), Some(AlertDescription::DecryptError));
    assert_eq!(server.close_state(), CloseState::ClosedError);
    assert_eq!(
        expect_alert(&mut client),
        Alert::fatal(AlertDescription::DecryptError)
    );
}

#[test]
fn test_tampered_record_is_bad_record_mac() {
    let (mut client, mut server, c2s, _) = established(
        ProtocolVersion::Tls11,
        CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
    );
    client.write(b"secret").unwrap();
    c2s.flip_last_byte();

    let mut buf = [0u8; 16];
    let err = server.read(&mut buf).unwrap_err();
    assert_eq!(err.alert_description(), Some(AlertDescription::BadRecordMac));
    assert!(!is_resumable(&server));
    assert_eq!(
        expect_alert(&mut client),
        Alert::fatal(AlertDescription::BadRecordMac)
    );
}

#[test]
fn test_record_overflow_before_body() {
    let (c, s, c2s, _) = pipe();
    let _client = plain(c, TlsRole::Client);
    let mut server = plain(s, TlsRole::Server);
    c2s.push(&[23, 3, 1, 0x48, 0x01]);
    let mut buf = [0u8; 8];
    let err = server.read(&mut buf).unwrap_err();
    assert_eq!(
        err.alert_description(),
        Some(AlertDescription::RecordOverflow)
    );
}

#[test]
fn test_unknown_record_type_is_decode_error() {
    let (_c, s, c2s, _) = pipe();
    let mut server = plain(s, TlsRole::Server);
    c2s.push(&[99, 3, 1, 0, 0]);
    let mut buf = [0u8; 8];
    let err = server.read(&mut buf).unwrap_err();
    assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
}

#[test]
fn test_ssl2_client_hello() {
    let (_c, s, c2s, _) = pipe();
    let mut server = plain(s, TlsRole::Server);
    let challenge: Vec<u8> = (0x30..0x40).collect();
    let mut payload = vec![1, 3, 1, 0, 6, 0, 0, 0, 16];
    payload.extend_from_slice(&[0x00, 0x00, 0x2F, 0x01, 0x00, 0x80]);
    payload.extend_from_slice(&challenge);
    c2s.push(&[0x80, payload.len() as u8]);
    c2s.push(&payload);

    let msg = server
        .receive_handshake(&[HandshakeType::ClientHello])
        .unwrap();
    let HandshakeMessage::ClientHello(hello) = msg else {
        panic!("expected ClientHello");
    };
    assert!(hello.ssl2);
    assert_eq!(hello.version, (3, 1));
    assert_eq!(
        hello.cipher_suites,
        vec![CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA]
    );
    assert_eq!(&hello.random[..16], &[0u8; 16]);
    assert_eq!(&hello.random[16..], challenge.as_slice());

    let mut expected = HandshakeHash::new();
    expected.append(&payload).unwrap();
    assert_eq!(
        server.handshake_hash().finished_hash().unwrap(),
        expected.finished_hash().unwrap()
    );
}

#[test]
fn test_would_block_transport_resumes() {
    let (c, s, _, _) = pipe();
    let version = ProtocolVersion::Tls10;
    let suite = CipherSuite::TLS_SRP_SHA_RSA_WITH_3DES_EDE_CBC_SHA;
    let mut client = keyed(Flaky::new(c), TlsRole::Client, version, suite);
    let mut server = keyed(Flaky::new(s), TlsRole::Server, version, suite);
    finish_handshake(&mut client, &mut server);

    let data = vec![0x5Au8; 40_000];
    client.write(&data).unwrap();
    let mut buf = vec![0u8; data.len()];
    assert_eq!(server.read_at_least(&mut buf, data.len()).unwrap(), data.len());
    assert_eq!(buf, data);
}

#[test]
fn test_connection_accessors() {
    let (client, _server, _, _) = established(
        ProtocolVersion::Ssl30,
        CipherSuite::TLS_SRP_SHA_WITH_3DES_EDE_CBC_SHA,
    );
    assert_eq!(client.role(), TlsRole::Client);
    assert_eq!(client.protocol_version(), ProtocolVersion::Ssl30);
    assert_eq!(client.cipher_name(), Some("3des"));
    assert!(!client.resumed());
    assert_eq!(
        client.session().lock().unwrap().cipher_suite,
        Some(CipherSuite::TLS_SRP_SHA_WITH_3DES_EDE_CBC_SHA)
    );
    assert!(client.record_layer().write_state().is_protected());
}

#[test]
fn test_pending_states_require_master_secret() {
    let (c, _s, _, _) = pipe();
    let config = TlsConfig::builder().build().unwrap();
    let mut client = Connection::new(c, config);
    client.set_cipher_suite(CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA);
    let err = client
        .calc_pending_states(&CLIENT_RANDOM, &SERVER_RANDOM)
        .unwrap_err();
    assert_eq!(err.alert_description(), Some(AlertDescription::InternalError));
}
