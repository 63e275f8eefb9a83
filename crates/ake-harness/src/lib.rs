//! In-process loopback harness: binds `127.0.0.1:0`, spawns the initiator and
//! responder state machines against each other over that socket, and hands
//! back both sides' results. Used by integration tests and `verify-vectors`
//! so neither has to stand up two real processes.

use ake_core::protocol::{initiator, responder};
use ake_core::{HandshakeTimeouts, KeyStore, Registry, SessionKey, Username};
use std::path::Path;
use tokio::net::{TcpListener, TcpStream};

/// Outcome of one loopback session, both sides' session keys and the
/// responder's view of who connected.
pub struct SessionPair {
    pub initiator_key: SessionKey,
    pub responder_key: SessionKey,
    pub responder_saw_username: Username,
}

/// Run one full handshake between a fresh initiator (using `initiator_keys`)
/// and a responder backed by `registry`, over a loopback TCP connection.
///
/// `registry` is passed by value and returned alongside the session pair so
/// callers can assert on TOFU pinning state after the exchange.
pub async fn run_loopback(
    username: &str,
    initiator_keys: &KeyStore,
    mut registry: Registry,
    timeouts: HandshakeTimeouts,
) -> anyhow::Result<(SessionPair, Registry)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let responder_timeouts = timeouts;
    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await?;
        let result = responder::run(&mut sock, &mut registry, responder_timeouts).await;
        anyhow::Ok((result, registry))
    });

    let username = Username::parse(username)?;
    let mut client = TcpStream::connect(addr).await?;
    let initiator_key = initiator::run(&mut client, &username, initiator_keys, timeouts).await?;

    let (responder_result, registry) = server.await??;
    let (responder_saw_username, responder_key) = responder_result?;

    Ok((
        SessionPair { initiator_key, responder_key, responder_saw_username },
        registry,
    ))
}

/// Convenience wrapper that loads (or creates) a registry file and an
/// initiator keystore file under `dir`, then runs [`run_loopback`].
pub async fn run_loopback_with_files(
    dir: &Path,
    username: &str,
    timeouts: HandshakeTimeouts,
) -> anyhow::Result<SessionPair> {
    let registry = Registry::load(dir.join("client_keys.json"))?;
    let keys = KeyStore::load_or_generate(dir.join("client_dilithium_keys.bin"))?;
    let (pair, _) = run_loopback(username, &keys, registry, timeouts).await?;
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loopback_session_derives_matching_master_keys() {
        let dir = tempdir().unwrap();
        let registry = Registry::load(dir.path().join("client_keys.json")).unwrap();
        let keys = KeyStore::load_or_generate(dir.path().join("client_dilithium_keys.bin")).unwrap();

        let (pair, registry) = run_loopback("bob_the_builder", &keys, registry, HandshakeTimeouts::default())
            .await
            .unwrap();

        assert_eq!(pair.responder_saw_username.as_str(), "bob_the_builder");
        assert_eq!(pair.initiator_key.as_bytes(), pair.responder_key.as_bytes());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn second_session_for_the_same_user_does_not_repin() {
        let dir = tempdir().unwrap();
        let keys = KeyStore::load_or_generate(dir.path().join("client_dilithium_keys.bin")).unwrap();

        let registry = Registry::load(dir.path().join("client_keys.json")).unwrap();
        let (_pair, registry) =
            run_loopback("carol_99", &keys, registry, HandshakeTimeouts::default()).await.unwrap();
        assert_eq!(registry.len(), 1);

        let (pair2, registry2) =
            run_loopback("carol_99", &keys, registry, HandshakeTimeouts::default()).await.unwrap();
        assert_eq!(registry2.len(), 1);
        assert_eq!(pair2.initiator_key.as_bytes(), pair2.responder_key.as_bytes());
    }
}
