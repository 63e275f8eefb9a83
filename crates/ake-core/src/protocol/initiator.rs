//! Initiator (joining peer) state machine, spec §4.6 steps 1-8.

use super::{with_timeout, HandshakeTimeouts, Username};
use crate::crypto;
use crate::error::{AkeError, Result};
use crate::framing::{self, MessageType};
use crate::keystore::KeyStore;
use crate::session::SessionKey;
use crate::transcript::Transcript;
use tokio::net::TcpStream;

/// Drive one session to completion over an already-connected socket.
pub async fn run(
    stream: &mut TcpStream,
    username: &Username,
    long_term: &KeyStore,
    timeouts: HandshakeTimeouts,
) -> Result<SessionKey> {
    let mut transcript = Transcript::new();

    // Ephemeral KEM keypair, fresh every session (no forward secrecy beyond
    // this one session is claimed or needed).
    let (kem_pub, kem_sec) = crypto::kem_keypair();

    // 1. CONNECT (already connected by caller) -> send HELLO
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::Hello, username.as_str().as_bytes()),
    )
    .await?;
    transcript.push_payload(username.as_str().as_bytes());
    tracing::info!(username = username.as_str(), "sent HELLO");

    // 2. AWAIT_RESPONSE
    let (first_type, _) = with_timeout(timeouts.frame, framing::recv_message(stream)).await?;
    if first_type == MessageType::SigKeyRequest {
        tracing::info!("responder requested long-term signature key");
        let pk = long_term.public_key_bytes();
        with_timeout(
            timeouts.frame,
            framing::send_message(stream, MessageType::SigPublicKey, &pk),
        )
        .await?;
        transcript.push_payload(&pk);

        with_timeout(
            timeouts.frame,
            framing::recv_expect(stream, MessageType::KemKeyRequest),
        )
        .await?;
    } else if first_type != MessageType::KemKeyRequest {
        return Err(AkeError::protocol(format!(
            "expected SIG-KEY-REQUEST or KEM-KEY-REQUEST, got {first_type:?}"
        )));
    }

    // 3. SIGN_KEM
    let kem_pub_bytes = crypto::kem_public_key_bytes(&kem_pub);
    let signature = crypto::sign(&long_term.secret_key, &kem_pub_bytes);
    let mut signed_payload = kem_pub_bytes;
    signed_payload.extend_from_slice(&signature);
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::KemPublicKeySigned, &signed_payload),
    )
    .await?;
    transcript.push_payload(&signed_payload);

    // 4. AWAIT_SECRET
    let ciphertext = with_timeout(
        timeouts.frame,
        framing::recv_expect(stream, MessageType::EncryptedSecret),
    )
    .await?;
    transcript.push_payload(&ciphertext);
    let shared_secret = crypto::decapsulate(&kem_sec, &ciphertext)?;

    // 5. SEND_HMAC
    let our_tag = crypto::hmac_sha512(&shared_secret, transcript.as_bytes());
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::HmacTag, &our_tag),
    )
    .await?;

    // 6. AWAIT_SERVER_HMAC
    //
    // Both sides compute HMAC over the identical transcript with the
    // identical key, so the expectation we recompute here is equal to
    // `our_tag` by construction; this check is really "did the responder
    // echo back the tag we agree on", not an independent authentication of
    // a value we haven't already derived ourselves (spec §9).
    let server_tag = with_timeout(timeouts.frame, framing::recv_expect(stream, MessageType::HmacTag)).await?;
    let expected = crypto::hmac_sha512(&shared_secret, transcript.as_bytes());
    if !crypto::tags_equal(&server_tag, &expected) {
        tracing::error!("transcript HMAC mismatch");
        return Err(AkeError::HmacMismatch);
    }

    // 7. report success (0x09 HMAC-VERIFY-FAILURE is reserved and never sent)
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::HmacVerifySuccess, &[]),
    )
    .await?;
    tracing::info!("mutual HMAC verification complete");

    // 8. DERIVE
    let master = crypto::derive_srtp_master_key(&shared_secret);
    Ok(SessionKey::new(master))
}
