//! Cryptographic primitives façade: ML-DSA-65 signatures, ML-KEM-768 key
//! encapsulation, HKDF-SHA256 key derivation, and HMAC-SHA512 transcript
//! authentication.
//!
//! Algorithm choice is pinned to what the original implementation used
//! (`OQS_SIG_alg_ml_dsa_65` and `OQS_KEM_alg_kyber_768`), both NIST security
//! level 3.

use crate::error::{AkeError, Result};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use pqcrypto_mldsa::mldsa65;
use pqcrypto_mlkem::mlkem768;
use pqcrypto_traits::kem::{
    Ciphertext as _, PublicKey as KemPublicKeyTrait, SecretKey as KemSecretKeyTrait,
    SharedSecret as _,
};
use pqcrypto_traits::sign::{
    DetachedSignature as _, PublicKey as SigPublicKeyTrait, SecretKey as SigSecretKeyTrait,
};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

pub const SRTP_MASTER_KEY_LEN: usize = 46;
const SHARED_SECRET_LEN: usize = 32;
const HKDF_INFO: &[u8] = b"SRTP-AES256-SALT";

/// Both sides split message 0x05 (KEM-PUBLIC-KEY-SIGNED) at this offset
/// without a length delimiter, so callers must keep this in sync with the
/// KEM in use; `protocol::tests` asserts it matches `mlkem768` at runtime.
pub fn kem_public_key_len() -> usize {
    mlkem768::public_key_bytes()
}

pub type SigPublicKey = mldsa65::PublicKey;
pub type SigSecretKey = mldsa65::SecretKey;
pub type KemPublicKey = mlkem768::PublicKey;

/// The ephemeral ML-KEM-768 secret key, held only for the lifetime of one
/// handshake. `mlkem768::SecretKey` carries no zeroize guarantee of its own,
/// so the raw bytes are kept in a `Zeroizing` buffer and the concrete
/// pqcrypto type is reconstructed on demand for `decapsulate`.
pub struct KemSecretKey(Zeroizing<Vec<u8>>);

impl KemSecretKey {
    fn pq_key(&self) -> Result<mlkem768::SecretKey> {
        mlkem768::SecretKey::from_bytes(&self.0)
            .map_err(|e| AkeError::crypto(format!("invalid KEM secret key: {e}")))
    }
}

/// 32-byte value shared by both peers after encaps/decaps. Used both as the
/// HMAC key and as HKDF input keying material, then dropped.
pub struct SharedSecret(Zeroizing<[u8; SHARED_SECRET_LEN]>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SHARED_SECRET_LEN] {
        &self.0
    }
}

/// Generate a fresh ML-DSA-65 long-term signature keypair.
pub fn sig_keypair() -> (SigPublicKey, SigSecretKey) {
    mldsa65::keypair()
}

pub fn sig_public_key_from_bytes(bytes: &[u8]) -> Result<SigPublicKey> {
    SigPublicKeyTrait::from_bytes(bytes).map_err(|e| AkeError::crypto(format!("invalid signature public key: {e}")))
}

pub fn sig_secret_key_from_bytes(bytes: &[u8]) -> Result<SigSecretKey> {
    SigSecretKeyTrait::from_bytes(bytes).map_err(|e| AkeError::crypto(format!("invalid signature secret key: {e}")))
}

pub fn sig_public_key_bytes() -> usize {
    mldsa65::public_key_bytes()
}

pub fn sig_secret_key_bytes() -> usize {
    mldsa65::secret_key_bytes()
}

/// Detached-sign `msg` under `sk`.
pub fn sign(sk: &SigSecretKey, msg: &[u8]) -> Vec<u8> {
    mldsa65::detached_sign(msg, sk).as_bytes().to_vec()
}

/// Verify a detached signature. Never panics; a malformed signature is
/// simply `Ok(false)`.
pub fn verify(pk: &SigPublicKey, msg: &[u8], sig: &[u8]) -> Result<bool> {
    let sig = match mldsa65::DetachedSignature::from_bytes(sig) {
        Ok(s) => s,
        Err(_) => return Ok(false),
    };
    Ok(mldsa65::verify_detached_signature(&sig, msg, pk).is_ok())
}

/// Generate a fresh ephemeral ML-KEM-768 keypair for one session.
pub fn kem_keypair() -> (KemPublicKey, KemSecretKey) {
    let (pk, sk) = mlkem768::keypair();
    (pk, KemSecretKey(Zeroizing::new(sk.as_bytes().to_vec())))
}

pub fn kem_public_key_from_bytes(bytes: &[u8]) -> Result<KemPublicKey> {
    KemPublicKeyTrait::from_bytes(bytes).map_err(|e| AkeError::crypto(format!("invalid KEM public key: {e}")))
}

pub fn kem_public_key_bytes(pk: &KemPublicKey) -> Vec<u8> {
    KemPublicKeyTrait::as_bytes(pk).to_vec()
}

/// Encapsulate a fresh shared secret to `pk`, returning (ciphertext, secret).
pub fn encapsulate(pk: &KemPublicKey) -> (Vec<u8>, SharedSecret) {
    let (ss, ct) = mlkem768::encapsulate(pk);
    let mut secret = [0u8; SHARED_SECRET_LEN];
    secret.copy_from_slice(ss.as_bytes());
    (
        pqcrypto_traits::kem::Ciphertext::as_bytes(&ct).to_vec(),
        SharedSecret(Zeroizing::new(secret)),
    )
}

/// Decapsulate `ct` under `sk`, recovering the shared secret.
pub fn decapsulate(sk: &KemSecretKey, ct: &[u8]) -> Result<SharedSecret> {
    let ct = mlkem768::Ciphertext::from_bytes(ct)
        .map_err(|e| AkeError::crypto(format!("invalid KEM ciphertext: {e}")))?;
    let sk = sk.pq_key()?;
    let ss = mlkem768::decapsulate(&ct, &sk);
    let mut secret = [0u8; SHARED_SECRET_LEN];
    secret.copy_from_slice(ss.as_bytes());
    Ok(SharedSecret(Zeroizing::new(secret)))
}

type HmacSha512 = Hmac<sha2::Sha512>;

/// HMAC-SHA512 over `data` keyed by the 32-byte shared secret.
pub fn hmac_sha512(key: &SharedSecret, data: &[u8]) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data);
    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Constant-time comparison of two HMAC tags. A length mismatch is treated
/// as unequal without leaking the true length via an early return on data.
pub fn tags_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Derive the 46-byte SRTP master key (32-byte AES key ‖ 14-byte salt) from
/// the 32-byte shared secret via HKDF-SHA256, empty salt, fixed info string.
pub fn derive_srtp_master_key(secret: &SharedSecret) -> Zeroizing<[u8; SRTP_MASTER_KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, secret.as_bytes());
    let mut out = [0u8; SRTP_MASTER_KEY_LEN];
    hk.expand(HKDF_INFO, &mut out)
        .expect("46 bytes is within HKDF-SHA256's output length limit");
    Zeroizing::new(out)
}
