//! Handshake message reassembly across record boundaries.
//!
//! One record may carry several handshake messages and one message may span
//! several records; only the 4-byte handshake header decides where a message
//! ends.

use std::collections::VecDeque;

use super::codec::HANDSHAKE_HEADER_LEN;
use mintls_types::{AlertDescription, TlsError};

/// Queue of complete raw handshake messages plus an incomplete tail.
#[derive(Debug, Default)]
pub struct HandshakeBuffer {
    messages: VecDeque<Vec<u8>>,
    partial: Vec<u8>,
}

impl HandshakeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the payload of one handshake record and split out every
    /// message it completes.
    pub fn push_record(&mut self, payload: &[u8]) -> Result<(), TlsError> {
        if payload.is_empty() {
            return Err(TlsError::local(
                AlertDescription::DecodeError,
                "empty handshake record",
            ));
        }
        self.partial.extend_from_slice(payload);
        while self.partial.len() >= HANDSHAKE_HEADER_LEN {
            let body_len = (usize::from(self.partial[1]) << 16)
                | (usize::from(self.partial[2]) << 8)
                | usize::from(self.partial[3]);
            let total = HANDSHAKE_HEADER_LEN + body_len;
            if self.partial.len() < total {
                break;
            }
            let rest = self.partial.split_off(total);
            let msg = std::mem::replace(&mut self.partial, rest);
            self.messages.push_back(msg);
        }
        Ok(())
    }

    /// Next complete message (header included), in wire order.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        self.messages.pop_front()
    }

    /// Type byte of the next complete message.
    pub fn peek_type(&self) -> Option<u8> {
        self.messages.front().map(|m| m[0])
    }

    /// True while part of a message is still waiting for more records.
    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    pub fn has_message(&self) -> bool {
        !self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.partial.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_several_messages_in_one_record() {
        let mut buf = HandshakeBuffer::new();
        buf.push_record(&[14, 0, 0, 0, 20, 0, 0, 2, 0xAA, 0xBB])
            .unwrap();
        assert_eq!(buf.peek_type(), Some(14));
        assert_eq!(buf.pop().unwrap(), vec![14, 0, 0, 0]);
        assert_eq!(buf.pop().unwrap(), vec![20, 0, 0, 2, 0xAA, 0xBB]);
        assert!(buf.pop().is_none());
        assert!(!buf.has_partial());
    }

    #[test]
    fn test_message_spanning_records() {
        let mut buf = HandshakeBuffer::new();
        buf.push_record(&[11, 0]).unwrap();
        assert!(!buf.has_message());
        assert!(buf.has_partial());
        buf.push_record(&[0, 3, 1]).unwrap();
        assert!(!buf.has_message());
        buf.push_record(&[2, 3, 14, 0]).unwrap();
        assert_eq!(buf.pop().unwrap(), vec![11, 0, 0, 3, 1, 2, 3]);
        assert!(buf.has_partial());
        buf.push_record(&[0, 0]).unwrap();
        assert_eq!(buf.pop().unwrap(), vec![14, 0, 0, 0]);
        assert!(!buf.has_partial());
    }

    #[test]
    fn test_empty_record_is_decode_error() {
        let mut buf = HandshakeBuffer::new();
        let err = buf.push_record(&[]).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }
}
