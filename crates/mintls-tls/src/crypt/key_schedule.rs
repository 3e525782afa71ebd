//! Master secret, key block and Finished derivation.

use super::cipher::BulkCipher;
use super::mac::RecordMac;
use super::prf::{prf, prf_ssl3};
use super::transcript::HandshakeHash;
use super::CipherSuiteParams;
use crate::record::encryption::ConnectionState;
use crate::{CipherSuite, ProtocolVersion, TlsRole};
use mintls_types::TlsError;
use zeroize::Zeroize;

/// Master secret length.
pub const MASTER_SECRET_LEN: usize = 48;

/// Compute the 48-byte master secret from the premaster secret.
pub fn derive_master_secret(
    version: ProtocolVersion,
    pre_master: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Vec<u8>, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    match version {
        ProtocolVersion::Ssl30 => prf_ssl3(pre_master, &seed, MASTER_SECRET_LEN),
        _ => prf(pre_master, b"master secret", &seed, MASTER_SECRET_LEN),
    }
}

/// Key material sliced out of the key block.
pub struct KeyBlock {
    pub client_mac_key: Vec<u8>,
    pub server_mac_key: Vec<u8>,
    pub client_key: Vec<u8>,
    pub server_key: Vec<u8>,
    pub client_iv: Vec<u8>,
    pub server_iv: Vec<u8>,
}

impl Drop for KeyBlock {
    fn drop(&mut self) {
        self.client_mac_key.zeroize();
        self.server_mac_key.zeroize();
        self.client_key.zeroize();
        self.server_key.zeroize();
        self.client_iv.zeroize();
        self.server_iv.zeroize();
    }
}

/// Expand the master secret into the key block (seed = server_random || client_random).
pub fn derive_key_block(
    version: ProtocolVersion,
    params: &CipherSuiteParams,
    master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<KeyBlock, TlsError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let total = params.key_block_len();
    let mut block = match version {
        ProtocolVersion::Ssl30 => prf_ssl3(master_secret, &seed, total)?,
        _ => prf(master_secret, b"key expansion", &seed, total)?,
    };

    let mut pos = 0;
    let mut take = |n: usize| {
        let part = block[pos..pos + n].to_vec();
        pos += n;
        part
    };
    let kb = KeyBlock {
        client_mac_key: take(params.mac_key_len),
        server_mac_key: take(params.mac_key_len),
        client_key: take(params.key_len),
        server_key: take(params.key_len),
        client_iv: take(params.iv_len),
        server_iv: take(params.iv_len),
    };
    block.zeroize();
    Ok(kb)
}

/// Derive the pending `(read, write)` connection states for `role`.
pub fn derive_states(
    version: ProtocolVersion,
    role: TlsRole,
    master_secret: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
    suite: CipherSuite,
) -> Result<(ConnectionState, ConnectionState), TlsError> {
    let params = CipherSuiteParams::from_suite(suite)?;
    let kb = derive_key_block(version, &params, master_secret, client_random, server_random)?;
    let mac_kind = version.policy().mac;

    let client = ConnectionState::new(
        RecordMac::new(mac_kind, &kb.client_mac_key)?,
        BulkCipher::new(params.bulk, &kb.client_key, &kb.client_iv)?,
    );
    let server = ConnectionState::new(
        RecordMac::new(mac_kind, &kb.server_mac_key)?,
        BulkCipher::new(params.bulk, &kb.server_key, &kb.server_iv)?,
    );
    Ok(match role {
        TlsRole::Client => (server, client),
        TlsRole::Server => (client, server),
    })
}

/// Finished verify_data for the given sender role.
///
/// TLS: `PRF(ms, "client finished" | "server finished", MD5 || SHA1, 12)`.
/// SSL 3.0: the 36-byte combined hash with sender "CLNT" / "SRVR".
pub fn compute_verify_data(
    version: ProtocolVersion,
    hash: &HandshakeHash,
    master_secret: &[u8],
    sender: TlsRole,
) -> Result<Vec<u8>, TlsError> {
    match version {
        ProtocolVersion::Ssl30 => {
            let label: &[u8] = match sender {
                TlsRole::Client => b"CLNT",
                TlsRole::Server => b"SRVR",
            };
            Ok(hash.ssl3_hash(master_secret, label)?.to_vec())
        }
        _ => {
            let label: &[u8] = match sender {
                TlsRole::Client => b"client finished",
                TlsRole::Server => b"server finished",
            };
            let digest = hash.finished_hash()?;
            prf(master_secret, label, &digest, version.policy().finished_len)
        }
    }
}
