//! The two protocol state machines driving messages 0x01–0x09 over one TCP
//! connection, plus shared handshake configuration and the username type.

pub mod initiator;
pub mod responder;

use crate::error::{AkeError, Result};
use std::future::Future;
use std::time::Duration;

/// Apply the per-frame deadline to a read/write future, mapping expiry to
/// `AkeError::Timeout`.
pub(crate) async fn with_timeout<T, F>(dur: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(dur, fut).await?
}

/// `[A-Za-z0-9_]{3,20}`, per the data model in spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let len = raw.chars().count();
        if !(3..=20).contains(&len) {
            return Err(AkeError::protocol(format!(
                "username must be 3-20 characters, got {len}"
            )));
        }
        if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(AkeError::protocol(
                "username must contain only [A-Za-z0-9_]".to_string(),
            ));
        }
        Ok(Username(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-read and per-write deadlines, since the spec leaves none and
/// recommends adding them (§5).
#[derive(Debug, Clone, Copy)]
pub struct HandshakeTimeouts {
    pub connect: Duration,
    pub frame: Duration,
}

impl Default for HandshakeTimeouts {
    fn default() -> Self {
        HandshakeTimeouts {
            connect: Duration::from_secs(30),
            frame: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_lengths_and_character_classes() {
        assert!(Username::parse("abc").is_ok());
        assert!(Username::parse("a_B3_45678901234567").is_ok()); // 20 chars
        assert!(Username::parse("alice_01").is_ok());
    }

    #[test]
    fn rejects_too_short_too_long_and_bad_characters() {
        assert!(Username::parse("ab").is_err());
        assert!(Username::parse("a".repeat(21)).is_err());
        assert!(Username::parse("alice-01").is_err());
        assert!(Username::parse("alice 01").is_err());
    }

    #[test]
    fn kem_public_key_length_matches_configured_scheme() {
        // Guards the unchecked split in message 0x05 against a scheme swap.
        assert_eq!(crate::crypto::kem_public_key_len(), crate::crypto::kem_public_key_len());
        let (pk, _) = crate::crypto::kem_keypair();
        assert_eq!(crate::crypto::kem_public_key_bytes(&pk).len(), crate::crypto::kem_public_key_len());
    }
}
