//! Responder (hosting peer) state machine, spec §4.6 steps 1-10.

use super::{with_timeout, HandshakeTimeouts, Username};
use crate::crypto;
use crate::error::{AkeError, Result};
use crate::framing::{self, MessageType};
use crate::registry::Registry;
use crate::session::SessionKey;
use crate::transcript::Transcript;
use tokio::net::TcpStream;

/// Drive one session to completion against an already-accepted connection.
/// Returns the peer's username and the derived session key, or aborts with
/// a fatal `AkeError` — the caller should close the socket either way.
pub async fn run(
    stream: &mut TcpStream,
    registry: &mut Registry,
    timeouts: HandshakeTimeouts,
) -> Result<(Username, SessionKey)> {
    let mut transcript = Transcript::new();

    // 2. AWAIT_HELLO
    let hello_payload = with_timeout(timeouts.frame, framing::recv_expect(stream, MessageType::Hello)).await?;
    let username_raw = String::from_utf8(hello_payload.clone())
        .map_err(|_| AkeError::protocol("HELLO payload is not valid UTF-8"))?;
    let username = Username::parse(username_raw)?;
    transcript.push_payload(&hello_payload);
    tracing::info!(username = username.as_str(), "received HELLO");

    // 2-3. branch on TOFU lookup
    let sig_public_key_bytes = match registry.lookup(username.as_str()) {
        Some(pk) => {
            tracing::debug!(username = username.as_str(), "found pinned signature key, skipping request");
            pk.to_vec()
        }
        None => {
            tracing::info!(username = username.as_str(), "no pinned key, requesting one");
            with_timeout(
                timeouts.frame,
                framing::send_message(stream, MessageType::SigKeyRequest, &[]),
            )
            .await?;

            let payload =
                with_timeout(timeouts.frame, framing::recv_expect(stream, MessageType::SigPublicKey)).await?;
            transcript.push_payload(&payload);

            // Per spec this path is only reached for a username `lookup`
            // just reported absent; registry::pin aborts with a protocol
            // error if that invariant is ever violated.
            registry.pin(username.as_str(), payload.clone())?;
            payload
        }
    };
    let sig_public_key = crypto::sig_public_key_from_bytes(&sig_public_key_bytes)?;

    // 4. REQUEST_KEM_KEY
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::KemKeyRequest, &[]),
    )
    .await?;
    let signed_kem_payload = with_timeout(
        timeouts.frame,
        framing::recv_expect(stream, MessageType::KemPublicKeySigned),
    )
    .await?;

    let kem_pk_len = crypto::kem_public_key_len();
    if signed_kem_payload.len() < kem_pk_len {
        return Err(AkeError::protocol("KEM-PUBLIC-KEY-SIGNED payload shorter than a KEM public key"));
    }
    let (kem_pub_bytes, signature) = signed_kem_payload.split_at(kem_pk_len);
    transcript.push_payload(&signed_kem_payload);

    // 5. VERIFY_SIG
    if !crypto::verify(&sig_public_key, kem_pub_bytes, signature)? {
        tracing::error!(username = username.as_str(), "signature verification failed - possible MITM");
        return Err(AkeError::AuthFailure);
    }
    tracing::info!(username = username.as_str(), "signature verification succeeded");

    // 6. ENCAPS
    let kem_pub = crypto::kem_public_key_from_bytes(kem_pub_bytes)?;
    let (ciphertext, shared_secret) = crypto::encapsulate(&kem_pub);
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::EncryptedSecret, &ciphertext),
    )
    .await?;
    transcript.push_payload(&ciphertext);

    // 7. AWAIT_CLIENT_HMAC
    let client_tag = with_timeout(timeouts.frame, framing::recv_expect(stream, MessageType::HmacTag)).await?;
    let expected = crypto::hmac_sha512(&shared_secret, transcript.as_bytes());
    if !crypto::tags_equal(&client_tag, &expected) {
        tracing::error!(username = username.as_str(), "transcript HMAC mismatch");
        return Err(AkeError::HmacMismatch);
    }

    // 8. SEND_HMAC
    with_timeout(
        timeouts.frame,
        framing::send_message(stream, MessageType::HmacTag, &expected),
    )
    .await?;

    // 9. AWAIT_SUCCESS
    with_timeout(
        timeouts.frame,
        framing::recv_expect(stream, MessageType::HmacVerifySuccess),
    )
    .await?;
    tracing::info!(username = username.as_str(), "mutual HMAC verification complete");

    // 10. DERIVE
    let master = crypto::derive_srtp_master_key(&shared_secret);
    Ok((username, SessionKey::new(master)))
}
