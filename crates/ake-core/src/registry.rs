//! Responder-side identity registry: username → pinned ML-DSA-65 public key,
//! backed by `client_keys.json`.
//!
//! TOFU semantics: [`Registry::pin`] is normally called only for a username
//! the caller has already confirmed is [`Registry::lookup`]-absent (see
//! `protocol::responder`). A pin for a username that is already present is
//! one of spec §4.6's abort transitions, so it is surfaced as an
//! `AkeError::Protocol`, not a panic.

use crate::error::{AkeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RegistryRecord {
    dilithium_public_key: Vec<u8>,
}

/// Username → pinned signature public key, persisted as
/// `{ "<username>": { "dilithium_public_key": [..] } }`.
pub struct Registry {
    path: PathBuf,
    entries: HashMap<String, Vec<u8>>,
}

impl Registry {
    /// Load the registry from `path`, or start empty if the file is absent.
    /// A present-but-malformed file is a `Storage` error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Registry { path, entries: HashMap::new() });
        }

        let data = std::fs::read_to_string(&path)
            .map_err(|e| AkeError::storage(format!("reading {}: {e}", path.display())))?;
        let raw: HashMap<String, RegistryRecord> = serde_json::from_str(&data)
            .map_err(|e| AkeError::storage(format!("parsing {}: {e}", path.display())))?;
        let entries = raw.into_iter().map(|(u, r)| (u, r.dilithium_public_key)).collect();
        Ok(Registry { path, entries })
    }

    pub fn lookup(&self, username: &str) -> Option<&[u8]> {
        self.entries.get(username).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All pinned `(username, public_key)` pairs, for diagnostics (e.g. the
    /// `ake-endpoint registry list` subcommand). Order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(u, pk)| (u.as_str(), pk.as_slice()))
    }

    /// Insert a fresh pin and persist it. A re-pin of an already-registered
    /// username is one of spec §4.6's "transitions that abort": it is
    /// reported as a protocol error, not a process panic, so callers can
    /// propagate it through the ordinary `AkeError` path.
    pub fn pin(&mut self, username: &str, public_key: Vec<u8>) -> Result<()> {
        if self.entries.contains_key(username) {
            return Err(AkeError::protocol(format!(
                "registry TOFU violation: attempted to re-pin already-registered username {username}"
            )));
        }
        self.entries.insert(username.to_string(), public_key);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let raw: HashMap<&str, RegistryRecord> = self
            .entries
            .iter()
            .map(|(u, pk)| (u.as_str(), RegistryRecord { dilithium_public_key: pk.clone() }))
            .collect();
        let json = serde_json::to_string_pretty(&raw)
            .map_err(|e| AkeError::storage(format!("serializing registry: {e}")))?;

        write_atomic(&self.path, json.as_bytes())
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| AkeError::storage(format!("creating temp file in {}: {e}", dir.display())))?;
    tmp.write_all(data)
        .map_err(|e| AkeError::storage(format!("writing temp registry file: {e}")))?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| AkeError::storage(format!("syncing temp registry file: {e}")))?;
    tmp.persist(path)
        .map_err(|e| AkeError::storage(format!("renaming registry file into place: {e}")))?;
    Ok(())
}
