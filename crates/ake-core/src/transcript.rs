//! Append-only transcript of payload bytes contributed to the session.
//!
//! Both roles append exactly the payloads named in the handshake
//! (`ake-core::protocol`), in the order they are sent or received, never the
//! message type byte or length prefix. The buffer is zeroized on drop since
//! it becomes an HMAC input alongside the shared secret.

use zeroize::Zeroizing;

#[derive(Default)]
pub struct Transcript {
    bytes: Zeroizing<Vec<u8>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_payload(&mut self, payload: &[u8]) {
        self.bytes.extend_from_slice(payload);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_in_order() {
        let mut t = Transcript::new();
        t.push_payload(b"alice_01");
        t.push_payload(b"\x01\x02\x03");
        assert_eq!(t.as_bytes(), b"alice_01\x01\x02\x03");
    }
}
