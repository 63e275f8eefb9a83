//! Post-quantum authenticated key exchange for the calling app's peer-to-peer
//! signaling channel.
//!
//! Two devices that already share a TCP connection run [`protocol::initiator::run`]
//! and [`protocol::responder::run`] on either end to agree on a 46-byte SRTP
//! master key ([`session::SessionKey`]), authenticated by an ML-DSA-65
//! long-term identity ([`keystore::KeyStore`]) pinned trust-on-first-use in a
//! [`registry::Registry`] and bound together by an HMAC-SHA512 transcript
//! ([`transcript::Transcript`]) over ML-KEM-768 key encapsulation
//! ([`crypto`]). Messages cross the wire framed by [`framing`].
//!
//! This crate is transport-agnostic beyond "an already-connected
//! `tokio::net::TcpStream`" — dialing, listening, and retry policy belong to
//! the caller (see the `ake-endpoint` binary and `ake-harness` for examples).

pub mod crypto;
pub mod error;
pub mod framing;
pub mod keystore;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transcript;

pub use error::{AkeError, Result};
pub use keystore::KeyStore;
pub use protocol::{initiator, responder, HandshakeTimeouts, Username};
pub use registry::Registry;
pub use session::SessionKey;
