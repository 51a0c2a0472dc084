//! Durable storage for the session credential.
//!
//! The record survives process restarts and is read once at startup.
//! Backends: a JSON file in the cache directory, the OS keychain, or
//! process memory (tests and ephemeral runs).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::Credential;

/// Session file name in cache directory
pub const SESSION_FILE: &str = "session.json";

/// Service name used for keychain entries
const SERVICE_NAME: &str = "roomhub";

/// Keychain account holding the serialized record
const KEYRING_ACCOUNT: &str = "session";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt session record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Storage lock poisoned")]
    Poisoned,

    #[error("Session record did not persist in {0}")]
    NotPersisted(String),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Persistent key/value home of the `jwt` and `username` entries.
///
/// Implementations write and clear both entries as one unit.
pub trait CredentialStorage: Send + Sync {
    /// Read the record. A missing or half-written record is `None`.
    fn load(&self) -> Result<Option<Credential>, StorageError>;

    fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    /// Remove the record. Removing an absent record succeeds.
    fn clear(&self) -> Result<(), StorageError>;

    /// Where the record lives, for logs and `whoami`.
    fn describe(&self) -> String;
}

/// Tolerant on-disk shape: either key may be missing or empty.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(default)]
    jwt: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl StoredRecord {
    fn into_credential(self) -> Option<Credential> {
        match (self.jwt, self.username) {
            (Some(token), Some(principal)) => {
                let credential = Credential::new(token, principal);
                credential.is_usable().then_some(credential)
            }
            _ => None,
        }
    }
}

fn parse_record(contents: &str) -> Result<Option<Credential>, StorageError> {
    let record: StoredRecord = serde_json::from_str(contents)?;
    Ok(record.into_credential())
}

// ============================================================================
// File
// ============================================================================

/// Record stored as `session.json`, replaced atomically via rename.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl CredentialStorage for FileStorage {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        parse_record(&contents)
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let contents = serde_json::to_string_pretty(credential)?;

        // Write-then-rename so a crash never leaves one key without the other
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents).map_err(|e| StorageError::io(&tmp, e))?;
        restrict_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        debug!(path = %self.path.display(), "Session record written");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Session record removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| StorageError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

// ============================================================================
// Keyring
// ============================================================================

/// Record stored as a single OS keychain entry, so both keys change together.
#[derive(Debug, Clone)]
pub struct KeyringStorage {
    service: String,
    account: String,
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new(SERVICE_NAME, KEYRING_ACCOUNT)
    }
}

impl KeyringStorage {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl CredentialStorage for KeyringStorage {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        match self.entry()?.get_password() {
            Ok(contents) => parse_record(&contents),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let contents = serde_json::to_string(credential)?;
        self.entry()?.set_password(&contents)?;

        // Read back through a fresh entry
        if self.load()?.as_ref() != Some(credential) {
            return Err(StorageError::NotPersisted(self.describe()));
        }
        debug!(keychain = %self.describe(), "Session record written");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("keychain ({}/{})", self.service, self.account)
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local record. Clones share the same slot, which stands in for
/// storage that outlives a `SessionStore`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<Credential>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(credential: Credential) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(credential))),
        }
    }

    /// Raw contents, including records `load` would reject.
    pub fn snapshot(&self) -> Option<Credential> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl CredentialStorage for MemoryStorage {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(slot.clone().filter(Credential::is_usable))
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut slot = self.slot.lock().map_err(|_| StorageError::Poisoned)?;
        *slot = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
