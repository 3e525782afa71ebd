//! Per-direction connection state: MAC-then-encrypt protection of records.
//!
//! CBC fragment = encrypted([explicit_IV ||] plaintext || MAC || padding)
//! Stream fragment = encrypted(plaintext || MAC)
//!
//! Padding is `pad_len + 1` bytes all equal to `pad_len`, with the minimal
//! `pad_len` that block-aligns the data.

use super::ContentType;
use crate::crypt::cipher::BulkCipher;
use crate::crypt::mac::RecordMac;
use crate::ProtocolVersion;
use mintls_crypto::rand::fill_random;
use mintls_types::{AlertDescription, TlsError};
use subtle::ConstantTimeEq;

fn bad_record_mac() -> TlsError {
    TlsError::local(
        AlertDescription::BadRecordMac,
        "MAC failure (or padding failure)",
    )
}

/// MAC context, bulk cipher and sequence number for one traffic direction.
///
/// A default state (no MAC, no cipher) passes records through unchanged and
/// never advances the sequence number.
#[derive(Default)]
pub struct ConnectionState {
    mac: Option<RecordMac>,
    cipher: Option<BulkCipher>,
    seq: u64,
}

impl ConnectionState {
    pub fn new(mac: RecordMac, cipher: BulkCipher) -> Self {
        Self {
            mac: Some(mac),
            cipher: Some(cipher),
            seq: 0,
        }
    }

    /// True once keys are installed.
    pub fn is_protected(&self) -> bool {
        self.mac.is_some() || self.cipher.is_some()
    }

    /// True when the bulk cipher is a CBC block cipher.
    pub fn is_block_cipher(&self) -> bool {
        self.cipher
            .as_ref()
            .is_some_and(|c| c.block_size().is_some())
    }

    pub fn cipher(&self) -> Option<&BulkCipher> {
        self.cipher.as_ref()
    }

    /// Sequence number the next record will be MACed with.
    pub fn sequence_number(&self) -> u64 {
        self.seq
    }

    fn advance_seq(&mut self) -> Result<(), TlsError> {
        if self.mac.is_some() {
            self.seq = self.seq.checked_add(1).ok_or_else(|| {
                TlsError::local(
                    AlertDescription::InternalError,
                    "sequence number overflow",
                )
            })?;
        }
        Ok(())
    }

    /// Protect one plaintext fragment.
    pub fn seal(
        &mut self,
        content_type: ContentType,
        version: ProtocolVersion,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if !self.is_protected() {
            return Ok(plaintext.to_vec());
        }
        let policy = version.policy();

        let mut data = Vec::with_capacity(plaintext.len() + 64);
        if let Some(bs) = self.cipher.as_ref().and_then(|c| c.block_size()) {
            if policy.explicit_iv {
                let mut iv = vec![0u8; bs];
                fill_random(&mut iv)?;
                data.extend_from_slice(&iv);
            }
        }
        data.extend_from_slice(plaintext);

        if let Some(mac) = &self.mac {
            let tag = mac.compute(self.seq, content_type as u8, version.wire(), plaintext)?;
            data.extend_from_slice(&tag);
        }

        if let Some(cipher) = self.cipher.as_mut() {
            if let Some(bs) = cipher.block_size() {
                let pad_len = (bs - (data.len() + 1) % bs) % bs;
                data.resize(data.len() + pad_len + 1, pad_len as u8);
            }
            cipher.encrypt(&mut data)?;
        }

        self.advance_seq()?;
        Ok(data)
    }

    /// Decrypt and verify one record fragment.
    ///
    /// Padding and MAC are always both checked; any failure, including a
    /// ciphertext that is not block aligned, is `bad_record_mac`.
    pub fn open(
        &mut self,
        content_type: ContentType,
        version: ProtocolVersion,
        fragment: Vec<u8>,
    ) -> Result<Vec<u8>, TlsError> {
        if !self.is_protected() {
            return Ok(fragment);
        }
        let policy = version.policy();
        let mac_len = self.mac.as_ref().map_or(0, |m| m.output_size());
        let mut data = fragment;

        let mut good = 1u8;
        let mut content_len = data.len().saturating_sub(mac_len);
        if data.len() < mac_len {
            good = 0;
        }

        if let Some(cipher) = self.cipher.as_mut() {
            match cipher.block_size() {
                Some(bs) => {
                    if data.is_empty() || data.len() % bs != 0 {
                        return Err(bad_record_mac());
                    }
                    cipher.decrypt(&mut data)?;
                    if policy.explicit_iv {
                        data.drain(..bs);
                        if data.is_empty() {
                            return Err(bad_record_mac());
                        }
                    }

                    let pad_len = usize::from(data[data.len() - 1]);
                    let overhead = pad_len + 1 + mac_len;
                    good = u8::from(overhead <= data.len());
                    if policy.check_padding_bytes {
                        let pad_start = data.len().saturating_sub(pad_len + 1);
                        for b in &data[pad_start..] {
                            good &= b.ct_eq(&(pad_len as u8)).unwrap_u8();
                        }
                    }
                    content_len = if overhead <= data.len() {
                        data.len() - overhead
                    } else {
                        0
                    };
                }
                None => cipher.decrypt(&mut data)?,
            }
        }

        if let Some(mac) = &self.mac {
            let expected = mac.compute(
                self.seq,
                content_type as u8,
                version.wire(),
                &data[..content_len],
            )?;
            let received = if content_len + mac_len <= data.len() {
                &data[content_len..content_len + mac_len]
            } else {
                &data[..mac_len.min(data.len())]
            };
            good &= received.ct_eq(expected.as_slice()).unwrap_u8();
        }

        if good != 1 {
            return Err(bad_record_mac());
        }

        data.truncate(content_len);
        self.advance_seq()?;
        Ok(data)
    }
}
