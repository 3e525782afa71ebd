#![no_main]
use libfuzzer_sys::fuzz_target;
use mintls_tls::handshake::codec::{decode_client_hello_ssl2, decode_handshake};
use mintls_tls::handshake::{CertificateType, CodecContext};
use mintls_tls::{CipherSuite, ProtocolVersion};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte picks the negotiated context the decoders see
    let version = match data[0] % 3 {
        0 => ProtocolVersion::Ssl30,
        1 => ProtocolVersion::Tls10,
        _ => ProtocolVersion::Tls11,
    };
    let suite = CipherSuite::ALL[(data[0] as usize / 3) % CipherSuite::ALL.len()];
    let mut ctx = CodecContext::new(version).with_suite(suite);
    if data[0] & 0x80 != 0 {
        ctx.certificate_type = CertificateType::CRYPTO_ID;
    }

    let body = &data[1..];
    let _ = decode_handshake(body, &ctx);
    let _ = decode_client_hello_ssl2(body);
});
