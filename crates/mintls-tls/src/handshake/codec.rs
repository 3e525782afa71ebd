//! SSL 3.0 / TLS 1.0 / TLS 1.1 handshake message encoding and decoding.
//!
//! Encoding is two-pass: the message body is first written to a counting
//! sink to learn its length, then written again into an exact-size buffer
//! behind the `msg_type(1) || length(3)` header. Every decoder checks that
//! it consumed exactly the declared body.

use super::{CertificateType, CodecContext, HandshakeMessage, HandshakeType};
use crate::crypt::{CipherSuiteParams, KeyExchangeAlg};
use crate::CipherSuite;
use mintls_crypto::md5::Md5;
use mintls_crypto::sha1::Sha1;
use mintls_types::{AlertDescription, TlsError};

/// Handshake header length: type(1) || length(3).
pub const HANDSHAKE_HEADER_LEN: usize = 4;

const EXT_SRP: u16 = 6;
const EXT_CERT_TYPE: u16 = 7;
const MAX_U24: usize = 0x00FF_FFFF;

/// Typed field-level decode/encode failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("truncated {0}")]
    Truncated(&'static str),
    #[error("{extra} trailing bytes after {message}")]
    TrailingBytes { message: &'static str, extra: usize },
    #[error("handshake length mismatch: declared {declared}, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("unknown handshake type {0}")]
    UnknownHandshakeType(u8),
    #[error("{field} too long: {len} > {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("invalid {0}")]
    InvalidValue(&'static str),
    #[error("{0} required to decode this message")]
    MissingContext(&'static str),
}

impl From<CodecError> for TlsError {
    fn from(e: CodecError) -> Self {
        TlsError::local(AlertDescription::DecodeError, e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// ClientHello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub version: (u8, u8),
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<u8>,
    /// Written as extension 7 only when different from `[X509]`. An empty
    /// list is not written either, so it decodes back as `[X509]`.
    pub certificate_types: Vec<CertificateType>,
    /// Written as extension 6 when present and non-empty; `Some(vec![])`
    /// decodes back as `None`.
    pub srp_username: Option<Vec<u8>>,
    /// Parsed from SSLv2-compatible framing.
    pub ssl2: bool,
}

impl ClientHello {
    pub fn new(
        version: (u8, u8),
        random: [u8; 32],
        session_id: Vec<u8>,
        cipher_suites: Vec<CipherSuite>,
    ) -> Self {
        Self {
            version,
            random,
            session_id,
            cipher_suites,
            compression_methods: vec![0],
            certificate_types: vec![CertificateType::X509],
            srp_username: None,
            ssl2: false,
        }
    }
}

/// ServerHello message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub version: (u8, u8),
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: CipherSuite,
    pub compression_method: u8,
    /// Written as extension 7 only when not X.509.
    pub certificate_type: CertificateType,
}

/// Certificate chain as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateChain {
    /// DER certificates, leaf first.
    X509(Vec<Vec<u8>>),
    /// A single opaque chain for the cryptoID certificate type.
    Opaque(Vec<u8>),
}

/// Certificate message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateMsg {
    pub chain: CertificateChain,
}

/// CertificateRequest message. Authorities are kept as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub certificate_types: Vec<u8>,
    pub certificate_authorities: Vec<u8>,
}

/// SRP ServerKeyExchange. Integers are big-endian without leading zeros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerKeyExchange {
    pub srp_n: Vec<u8>,
    pub srp_g: Vec<u8>,
    pub srp_s: Vec<u8>,
    pub srp_b: Vec<u8>,
    /// Present for SRP+RSA suites.
    pub signature: Option<Vec<u8>>,
}

/// ClientKeyExchange message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKeyExchange {
    /// SRP public value A (big-endian, no leading zeros).
    Srp { srp_a: Vec<u8> },
    /// RSA-encrypted premaster secret.
    Rsa { encrypted_pre_master: Vec<u8> },
}

/// CertificateVerify message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub signature: Vec<u8>,
}

/// Finished message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: Vec<u8>,
}

/// Drop leading zero bytes of a big-endian integer; zero becomes empty.
pub fn normalize_uint(bytes: &[u8]) -> Vec<u8> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes[start..].to_vec()
}

impl ServerKeyExchange {
    pub fn srp(srp_n: &[u8], srp_g: &[u8], srp_s: &[u8], srp_b: &[u8]) -> Self {
        Self {
            srp_n: normalize_uint(srp_n),
            srp_g: normalize_uint(srp_g),
            srp_s: srp_s.to_vec(),
            srp_b: normalize_uint(srp_b),
            signature: None,
        }
    }

    /// `MD5(cr || sr || params) || SHA1(cr || sr || params)`, the input to the
    /// RSA signature of SRP+RSA suites. The signature itself is excluded.
    pub fn signed_hash(
        &self,
        client_random: &[u8; 32],
        server_random: &[u8; 32],
    ) -> Result<[u8; 36], CodecError> {
        let mut data = Vec::with_capacity(64 + 16 + self.srp_n.len() + self.srp_b.len());
        data.extend_from_slice(client_random);
        data.extend_from_slice(server_random);
        write_srp_params(self, &mut data)?;
        let mut out = [0u8; 36];
        out[..16].copy_from_slice(&Md5::digest(&data));
        out[16..].copy_from_slice(&Sha1::digest(&data));
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Sinks and reader
// ---------------------------------------------------------------------------

trait Sink {
    fn put(&mut self, bytes: &[u8]);

    fn put_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    fn put_u16(&mut self, v: u16) {
        self.put(&v.to_be_bytes());
    }

    fn put_u24(&mut self, v: usize) {
        self.put(&[(v >> 16) as u8, (v >> 8) as u8, v as u8]);
    }
}

/// Length-only pass.
struct Counter(usize);

impl Sink for Counter {
    fn put(&mut self, bytes: &[u8]) {
        self.0 += bytes.len();
    }
}

impl Sink for Vec<u8> {
    fn put(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

fn max_for(len_size: usize) -> usize {
    match len_size {
        1 => 0xFF,
        2 => 0xFFFF,
        _ => MAX_U24,
    }
}

fn put_len<S: Sink>(
    w: &mut S,
    len_size: usize,
    len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    let max = max_for(len_size);
    if len > max {
        return Err(CodecError::FieldTooLong { field, len, max });
    }
    match len_size {
        1 => w.put_u8(len as u8),
        2 => w.put_u16(len as u16),
        _ => w.put_u24(len),
    }
    Ok(())
}

fn put_var<S: Sink>(
    w: &mut S,
    len_size: usize,
    data: &[u8],
    field: &'static str,
) -> Result<(), CodecError> {
    put_len(w, len_size, data.len(), field)?;
    w.put(data);
    Ok(())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated(field));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        let b = self.take(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u24(&mut self, field: &'static str) -> Result<usize, CodecError> {
        let b = self.take(3, field)?;
        Ok(read_u24(b))
    }

    fn var(&mut self, len_size: usize, field: &'static str) -> Result<&'a [u8], CodecError> {
        let len = match len_size {
            1 => usize::from(self.u8(field)?),
            2 => usize::from(self.u16(field)?),
            _ => self.u24(field)?,
        };
        self.take(len, field)
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    fn finish(&self, message: &'static str) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes { message, extra }),
        }
    }
}

fn read_u24(b: &[u8]) -> usize {
    (usize::from(b[0]) << 16) | (usize::from(b[1]) << 8) | usize::from(b[2])
}

fn u16_list(bytes: &[u8], field: &'static str) -> Result<Vec<u16>, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::InvalidValue(field));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

fn key_exchange(ctx: &CodecContext) -> Result<KeyExchangeAlg, CodecError> {
    let suite = ctx
        .cipher_suite
        .ok_or(CodecError::MissingContext("cipher suite"))?;
    CipherSuiteParams::from_suite(suite)
        .map(|p| p.key_exchange)
        .map_err(|_| CodecError::InvalidValue("cipher suite"))
}

// ---------------------------------------------------------------------------
// Handshake header
// ---------------------------------------------------------------------------

/// Split a complete handshake message into `(type byte, body)`.
///
/// The declared length must match the body exactly.
pub fn parse_handshake_header(data: &[u8]) -> Result<(u8, &[u8]), CodecError> {
    if data.len() < HANDSHAKE_HEADER_LEN {
        return Err(CodecError::Truncated("handshake header"));
    }
    let declared = read_u24(&data[1..4]);
    let actual = data.len() - HANDSHAKE_HEADER_LEN;
    if declared != actual {
        return Err(CodecError::LengthMismatch { declared, actual });
    }
    Ok((data[0], &data[HANDSHAKE_HEADER_LEN..]))
}

/// Encode a handshake message with its 4-byte header.
pub fn encode_handshake(msg: &HandshakeMessage, ctx: &CodecContext) -> Result<Vec<u8>, CodecError> {
    let mut counter = Counter(0);
    write_body(msg, ctx, &mut counter)?;
    let len = counter.0;
    if len > MAX_U24 {
        return Err(CodecError::FieldTooLong {
            field: "handshake message",
            len,
            max: MAX_U24,
        });
    }

    let mut out = Vec::with_capacity(HANDSHAKE_HEADER_LEN + len);
    out.put_u8(msg.handshake_type() as u8);
    out.put_u24(len);
    write_body(msg, ctx, &mut out)?;
    Ok(out)
}

/// Decode a complete handshake message (header included).
pub fn decode_handshake(data: &[u8], ctx: &CodecContext) -> Result<HandshakeMessage, CodecError> {
    let (type_byte, body) = parse_handshake_header(data)?;
    let msg_type =
        HandshakeType::from_u8(type_byte).ok_or(CodecError::UnknownHandshakeType(type_byte))?;
    Ok(match msg_type {
        HandshakeType::ClientHello => HandshakeMessage::ClientHello(decode_client_hello(body)?),
        HandshakeType::ServerHello => HandshakeMessage::ServerHello(decode_server_hello(body)?),
        HandshakeType::Certificate => HandshakeMessage::Certificate(decode_certificate(body, ctx)?),
        HandshakeType::CertificateRequest => {
            HandshakeMessage::CertificateRequest(decode_certificate_request(body)?)
        }
        HandshakeType::ServerKeyExchange => {
            HandshakeMessage::ServerKeyExchange(decode_server_key_exchange(body, ctx)?)
        }
        HandshakeType::ServerHelloDone => {
            decode_server_hello_done(body)?;
            HandshakeMessage::ServerHelloDone
        }
        HandshakeType::ClientKeyExchange => {
            HandshakeMessage::ClientKeyExchange(decode_client_key_exchange(body, ctx)?)
        }
        HandshakeType::CertificateVerify => {
            HandshakeMessage::CertificateVerify(decode_certificate_verify(body)?)
        }
        HandshakeType::Finished => HandshakeMessage::Finished(decode_finished(body, ctx)?),
        HandshakeType::HelloRequest => return Err(CodecError::UnknownHandshakeType(type_byte)),
    })
}

fn write_body<S: Sink>(
    msg: &HandshakeMessage,
    ctx: &CodecContext,
    w: &mut S,
) -> Result<(), CodecError> {
    match msg {
        HandshakeMessage::ClientHello(ch) => write_client_hello(ch, w),
        HandshakeMessage::ServerHello(sh) => write_server_hello(sh, w),
        HandshakeMessage::Certificate(c) => write_certificate(c, w),
        HandshakeMessage::CertificateRequest(cr) => {
            put_var(w, 1, &cr.certificate_types, "certificate types")?;
            put_var(w, 2, &cr.certificate_authorities, "certificate authorities")
        }
        HandshakeMessage::ServerKeyExchange(ske) => {
            write_srp_params(ske, w)?;
            if let Some(sig) = &ske.signature {
                put_var(w, 2, sig, "signature")?;
            }
            Ok(())
        }
        HandshakeMessage::ServerHelloDone => Ok(()),
        HandshakeMessage::ClientKeyExchange(cke) => write_client_key_exchange(cke, ctx, w),
        HandshakeMessage::CertificateVerify(cv) => put_var(w, 2, &cv.signature, "signature"),
        HandshakeMessage::Finished(fin) => {
            if fin.verify_data.len() != ctx.version.policy().finished_len {
                return Err(CodecError::InvalidValue("verify_data length"));
            }
            w.put(&fin.verify_data);
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// ClientHello
// ---------------------------------------------------------------------------

fn has_cert_type_ext(types: &[CertificateType]) -> bool {
    !types.is_empty() && types != [CertificateType::X509]
}

fn write_client_hello<S: Sink>(ch: &ClientHello, w: &mut S) -> Result<(), CodecError> {
    w.put_u8(ch.version.0);
    w.put_u8(ch.version.1);
    w.put(&ch.random);
    put_var(w, 1, &ch.session_id, "session id")?;
    put_len(w, 2, ch.cipher_suites.len() * 2, "cipher suites")?;
    for suite in &ch.cipher_suites {
        w.put_u16(suite.0);
    }
    put_var(w, 1, &ch.compression_methods, "compression methods")?;

    let cert_ext = has_cert_type_ext(&ch.certificate_types);
    let srp_name = ch.srp_username.as_deref().filter(|n| !n.is_empty());
    let mut ext_len = 0;
    if cert_ext {
        ext_len += 5 + ch.certificate_types.len();
    }
    if let Some(name) = srp_name {
        ext_len += 5 + name.len();
    }
    if ext_len > 0 {
        put_len(w, 2, ext_len, "extensions")?;
    }
    if cert_ext {
        w.put_u16(EXT_CERT_TYPE);
        put_len(w, 2, ch.certificate_types.len() + 1, "certificate type extension")?;
        put_len(w, 1, ch.certificate_types.len(), "certificate types")?;
        for t in &ch.certificate_types {
            w.put_u8(t.0);
        }
    }
    if let Some(name) = srp_name {
        w.put_u16(EXT_SRP);
        put_len(w, 2, name.len() + 1, "srp extension")?;
        put_var(w, 1, name, "srp username")?;
    }
    Ok(())
}

/// Decode a ClientHello body. Unknown extensions are skipped.
pub fn decode_client_hello(body: &[u8]) -> Result<ClientHello, CodecError> {
    let mut r = Reader::new(body);
    let version = (r.u8("client version")?, r.u8("client version")?);
    let mut random = [0u8; 32];
    random.copy_from_slice(r.take(32, "client random")?);
    let session_id = r.var(1, "session id")?.to_vec();
    let cipher_suites = u16_list(r.var(2, "cipher suites")?, "cipher suites")?
        .into_iter()
        .map(CipherSuite)
        .collect();
    let compression_methods = r.var(1, "compression methods")?.to_vec();

    let mut certificate_types = vec![CertificateType::X509];
    let mut srp_username = None;
    if !r.is_empty() {
        let mut exts = Reader::new(r.var(2, "extensions")?);
        while !exts.is_empty() {
            let ext_type = exts.u16("extension type")?;
            let mut ext = Reader::new(exts.var(2, "extension")?);
            match ext_type {
                EXT_SRP => {
                    srp_username = Some(ext.var(1, "srp username")?.to_vec());
                    ext.finish("srp extension")?;
                }
                EXT_CERT_TYPE => {
                    certificate_types = ext
                        .var(1, "certificate types")?
                        .iter()
                        .map(|&t| CertificateType(t))
                        .collect();
                    ext.finish("certificate type extension")?;
                }
                _ => {}
            }
        }
    }
    r.finish("client hello")?;

    Ok(ClientHello {
        version,
        random,
        session_id,
        cipher_suites,
        compression_methods,
        certificate_types,
        srp_username,
        ssl2: false,
    })
}

/// Decode an SSLv2-framed ClientHello (the record payload after its type byte).
///
/// Layout: version(2), cipher-specs length(2), session-id length(2),
/// challenge length(2), 3-byte cipher specs, session id, challenge. Only
/// specs whose first byte is zero name TLS suites and are kept. The
/// challenge is left-padded with zeros to form the 32-byte random. Trailing
/// bytes are not checked.
pub fn decode_client_hello_ssl2(body: &[u8]) -> Result<ClientHello, CodecError> {
    let mut r = Reader::new(body);
    let version = (r.u8("client version")?, r.u8("client version")?);
    let specs_len = usize::from(r.u16("cipher specs length")?);
    let session_id_len = usize::from(r.u16("session id length")?);
    let challenge_len = usize::from(r.u16("challenge length")?);

    let specs = r.take(specs_len, "cipher specs")?;
    let cipher_suites = specs
        .chunks_exact(3)
        .filter(|s| s[0] == 0)
        .map(|s| CipherSuite(u16::from_be_bytes([s[1], s[2]])))
        .collect();
    let session_id = r.take(session_id_len, "session id")?.to_vec();
    let challenge = r.take(challenge_len, "challenge")?;
    if challenge.len() > 32 {
        return Err(CodecError::InvalidValue("challenge length"));
    }
    let mut random = [0u8; 32];
    random[32 - challenge.len()..].copy_from_slice(challenge);

    Ok(ClientHello {
        version,
        random,
        session_id,
        cipher_suites,
        compression_methods: vec![0],
        certificate_types: vec![CertificateType::X509],
        srp_username: None,
        ssl2: true,
    })
}

// ---------------------------------------------------------------------------
// ServerHello
// ---------------------------------------------------------------------------

fn write_server_hello<S: Sink>(sh: &ServerHello, w: &mut S) -> Result<(), CodecError> {
    w.put_u8(sh.version.0);
    w.put_u8(sh.version.1);
    w.put(&sh.random);
    put_var(w, 1, &sh.session_id, "session id")?;
    w.put_u16(sh.cipher_suite.0);
    w.put_u8(sh.compression_method);
    if sh.certificate_type != CertificateType::X509 {
        w.put_u16(5);
        w.put_u16(EXT_CERT_TYPE);
        w.put_u16(1);
        w.put_u8(sh.certificate_type.0);
    }
    Ok(())
}

pub fn decode_server_hello(body: &[u8]) -> Result<ServerHello, CodecError> {
    let mut r = Reader::new(body);
    let version = (r.u8("server version")?, r.u8("server version")?);
    let mut random = [0u8; 32];
    random.copy_from_slice(r.take(32, "server random")?);
    let session_id = r.var(1, "session id")?.to_vec();
    let cipher_suite = CipherSuite(r.u16("cipher suite")?);
    let compression_method = r.u8("compression method")?;

    let mut certificate_type = CertificateType::X509;
    if !r.is_empty() {
        let mut exts = Reader::new(r.var(2, "extensions")?);
        while !exts.is_empty() {
            let ext_type = exts.u16("extension type")?;
            let mut ext = Reader::new(exts.var(2, "extension")?);
            if ext_type == EXT_CERT_TYPE {
                certificate_type = CertificateType(ext.u8("certificate type")?);
                ext.finish("certificate type extension")?;
            }
        }
    }
    r.finish("server hello")?;

    Ok(ServerHello {
        version,
        random,
        session_id,
        cipher_suite,
        compression_method,
        certificate_type,
    })
}

// ---------------------------------------------------------------------------
// Certificate / CertificateRequest
// ---------------------------------------------------------------------------

fn write_certificate<S: Sink>(c: &CertificateMsg, w: &mut S) -> Result<(), CodecError> {
    match &c.chain {
        CertificateChain::X509(certs) => {
            let total: usize = certs.iter().map(|c| c.len() + 3).sum();
            put_len(w, 3, total, "certificate list")?;
            for cert in certs {
                put_var(w, 3, cert, "certificate")?;
            }
            Ok(())
        }
        CertificateChain::Opaque(chain) => put_var(w, 2, chain, "certificate chain"),
    }
}

/// Decode a Certificate body; the layout follows `ctx.certificate_type`.
pub fn decode_certificate(body: &[u8], ctx: &CodecContext) -> Result<CertificateMsg, CodecError> {
    let mut r = Reader::new(body);
    let chain = match ctx.certificate_type {
        CertificateType::X509 => {
            let mut list = Reader::new(r.var(3, "certificate list")?);
            let mut certs = Vec::new();
            while !list.is_empty() {
                certs.push(list.var(3, "certificate")?.to_vec());
            }
            CertificateChain::X509(certs)
        }
        CertificateType::CRYPTO_ID => {
            CertificateChain::Opaque(r.var(2, "certificate chain")?.to_vec())
        }
        _ => return Err(CodecError::InvalidValue("certificate type")),
    };
    r.finish("certificate")?;
    Ok(CertificateMsg { chain })
}

pub fn decode_certificate_request(body: &[u8]) -> Result<CertificateRequest, CodecError> {
    let mut r = Reader::new(body);
    let certificate_types = r.var(1, "certificate types")?.to_vec();
    let certificate_authorities = r.var(2, "certificate authorities")?.to_vec();
    r.finish("certificate request")?;
    Ok(CertificateRequest {
        certificate_types,
        certificate_authorities,
    })
}

// ---------------------------------------------------------------------------
// Key exchange
// ---------------------------------------------------------------------------

fn write_srp_params<S: Sink>(ske: &ServerKeyExchange, w: &mut S) -> Result<(), CodecError> {
    put_var(w, 2, &normalize_uint(&ske.srp_n), "srp N")?;
    put_var(w, 2, &normalize_uint(&ske.srp_g), "srp g")?;
    put_var(w, 1, &ske.srp_s, "srp salt")?;
    put_var(w, 2, &normalize_uint(&ske.srp_b), "srp B")
}

/// Decode an SRP ServerKeyExchange; SRP+RSA suites carry a signature.
pub fn decode_server_key_exchange(
    body: &[u8],
    ctx: &CodecContext,
) -> Result<ServerKeyExchange, CodecError> {
    let signed = key_exchange(ctx)? == KeyExchangeAlg::SrpRsa;
    let mut r = Reader::new(body);
    let srp_n = normalize_uint(r.var(2, "srp N")?);
    let srp_g = normalize_uint(r.var(2, "srp g")?);
    let srp_s = r.var(1, "srp salt")?.to_vec();
    let srp_b = normalize_uint(r.var(2, "srp B")?);
    let signature = if signed {
        Some(r.var(2, "signature")?.to_vec())
    } else {
        None
    };
    r.finish("server key exchange")?;
    Ok(ServerKeyExchange {
        srp_n,
        srp_g,
        srp_s,
        srp_b,
        signature,
    })
}

pub fn decode_server_hello_done(body: &[u8]) -> Result<(), CodecError> {
    Reader::new(body).finish("server hello done")
}

fn write_client_key_exchange<S: Sink>(
    cke: &ClientKeyExchange,
    ctx: &CodecContext,
    w: &mut S,
) -> Result<(), CodecError> {
    match cke {
        ClientKeyExchange::Srp { srp_a } => put_var(w, 2, &normalize_uint(srp_a), "srp A"),
        ClientKeyExchange::Rsa {
            encrypted_pre_master,
        } => {
            if ctx.version.policy().rsa_cke_length_prefixed {
                put_var(w, 2, encrypted_pre_master, "encrypted premaster")
            } else {
                w.put(encrypted_pre_master);
                Ok(())
            }
        }
    }
}

/// Decode a ClientKeyExchange; the layout follows the suite and version.
pub fn decode_client_key_exchange(
    body: &[u8],
    ctx: &CodecContext,
) -> Result<ClientKeyExchange, CodecError> {
    let mut r = Reader::new(body);
    let cke = match key_exchange(ctx)? {
        KeyExchangeAlg::Srp | KeyExchangeAlg::SrpRsa => ClientKeyExchange::Srp {
            srp_a: normalize_uint(r.var(2, "srp A")?),
        },
        KeyExchangeAlg::Rsa => {
            let encrypted_pre_master = if ctx.version.policy().rsa_cke_length_prefixed {
                r.var(2, "encrypted premaster")?.to_vec()
            } else {
                r.rest().to_vec()
            };
            ClientKeyExchange::Rsa {
                encrypted_pre_master,
            }
        }
    };
    r.finish("client key exchange")?;
    Ok(cke)
}

// ---------------------------------------------------------------------------
// CertificateVerify / Finished
// ---------------------------------------------------------------------------

pub fn decode_certificate_verify(body: &[u8]) -> Result<CertificateVerify, CodecError> {
    let mut r = Reader::new(body);
    let signature = r.var(2, "signature")?.to_vec();
    r.finish("certificate verify")?;
    Ok(CertificateVerify { signature })
}

/// Decode Finished: 36 bytes of verify_data for SSL 3.0, 12 otherwise.
pub fn decode_finished(body: &[u8], ctx: &CodecContext) -> Result<Finished, CodecError> {
    let mut r = Reader::new(body);
    let verify_data = r
        .take(ctx.version.policy().finished_len, "verify data")?
        .to_vec();
    r.finish("finished")?;
    Ok(Finished { verify_data })
}
