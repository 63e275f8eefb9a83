//! Initiator-side long-term key store: a single ML-DSA-65 keypair persisted
//! as `pub || sec` at fixed scheme lengths in `client_dilithium_keys.bin`.
//!
//! There is no username binding in the file; the username is supplied
//! externally per session by the launcher UI.

use crate::crypto::{self, SigPublicKey, SigSecretKey};
use crate::error::{AkeError, Result};
use std::path::{Path, PathBuf};

pub struct KeyStore {
    pub public_key: SigPublicKey,
    pub secret_key: SigSecretKey,
}

impl KeyStore {
    /// Load the keypair from `path` if present, else generate and persist a
    /// fresh one with restrictive permissions.
    pub fn load_or_generate(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            Self::load(&path)
        } else {
            Self::generate_and_save(&path)
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| AkeError::storage(format!("reading {}: {e}", path.display())))?;

        let pk_len = crypto::sig_public_key_bytes();
        let sk_len = crypto::sig_secret_key_bytes();
        if data.len() != pk_len + sk_len {
            return Err(AkeError::storage(format!(
                "{} has {} bytes, expected {}",
                path.display(),
                data.len(),
                pk_len + sk_len
            )));
        }

        let public_key = crypto::sig_public_key_from_bytes(&data[..pk_len])?;
        let secret_key = crypto::sig_secret_key_from_bytes(&data[pk_len..])?;
        Ok(KeyStore { public_key, secret_key })
    }

    fn generate_and_save(path: &Path) -> Result<Self> {
        let (public_key, secret_key) = crypto::sig_keypair();

        let mut bytes = Vec::with_capacity(crypto::sig_public_key_bytes() + crypto::sig_secret_key_bytes());
        bytes.extend_from_slice(pqcrypto_traits::sign::PublicKey::as_bytes(&public_key));
        bytes.extend_from_slice(pqcrypto_traits::sign::SecretKey::as_bytes(&secret_key));

        std::fs::write(path, &bytes)
            .map_err(|e| AkeError::storage(format!("writing {}: {e}", path.display())))?;
        set_secure_permissions(path)?;

        Ok(KeyStore { public_key, secret_key })
    }

    /// Public-key fingerprint (first 8 bytes of BLAKE3) for log lines.
    pub fn fingerprint(&self) -> String {
        let bytes = pqcrypto_traits::sign::PublicKey::as_bytes(&self.public_key);
        hex::encode(&blake3::hash(bytes).as_bytes()[..8])
    }

    pub fn public_key_bytes(&self) -> Vec<u8> {
        pqcrypto_traits::sign::PublicKey::as_bytes(&self.public_key).to_vec()
    }
}

#[cfg(unix)]
fn set_secure_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| AkeError::storage(format!("setting permissions on {}: {e}", path.display())))
}

#[cfg(not(unix))]
fn set_secure_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_on_first_run_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client_dilithium_keys.bin");

        let first = KeyStore::load_or_generate(&path).unwrap();
        assert!(path.exists());

        let second = KeyStore::load_or_generate(&path).unwrap();
        assert_eq!(first.public_key_bytes(), second.public_key_bytes());
    }

    #[test]
    fn fingerprint_is_stable_for_the_same_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("client_dilithium_keys.bin");
        let ks = KeyStore::load_or_generate(&path).unwrap();
        assert_eq!(ks.fingerprint(), ks.fingerprint());
        assert_eq!(ks.fingerprint().len(), 16);
    }

    #[cfg(unix)]
    #[test]
    fn key_file_has_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("client_dilithium_keys.bin");
        KeyStore::load_or_generate(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
