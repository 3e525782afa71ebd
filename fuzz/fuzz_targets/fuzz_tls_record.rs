#![no_main]
use libfuzzer_sys::fuzz_target;
use mintls_tls::record::{RecordHeader, RecordLayer};
use mintls_tls::{CipherSuite, ProtocolVersion, TlsRole};

fuzz_target!(|data: &[u8]| {
    let Some(&first) = data.first() else {
        return;
    };
    let Ok(header_len) = RecordHeader::header_len(first) else {
        return;
    };
    if data.len() < header_len {
        return;
    }
    let Ok(header) = RecordHeader::parse(&data[..header_len]) else {
        return;
    };
    let body = data[header_len..].to_vec();

    // Plaintext state
    let mut layer = RecordLayer::new(ProtocolVersion::Tls10);
    let _ = layer.open_record(&header, body.clone());

    // Keyed CBC state: MAC and padding checks must reject without panicking
    let mut keyed = RecordLayer::new(ProtocolVersion::Tls11);
    if keyed
        .calc_pending_states(
            TlsRole::Server,
            &[0x42; 48],
            &[1; 32],
            &[2; 32],
            CipherSuite::TLS_RSA_WITH_AES_128_CBC_SHA,
        )
        .is_ok()
        && keyed.activate_read().is_ok()
    {
        let _ = keyed.open_record(&header, body);
    }
});
