//! Persistent storage for the bearer credential.
//!
//! The store is the single source of truth for "is a session active".
//! Every backend keeps exactly one token under a fixed key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "researchhub";

/// Fixed key the credential is stored under.
pub const STORAGE_KEY: &str = "access_token";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Credential file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential storage unavailable: {0}")]
    Unavailable(String),
}

pub trait CredentialStore: Send + Sync {
    /// Persist the token, replacing any previous one.
    fn save(&self, token: &str) -> Result<(), StoreError>;

    fn read(&self) -> Result<Option<String>, StoreError>;

    /// Remove the token. Clearing an empty store succeeds.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Read the stored token, treating an unreadable store as "no credential".
pub fn stored_token(store: &dyn CredentialStore) -> Option<String> {
    match store.read() {
        Ok(token) => token.filter(|t| !t.is_empty()),
        Err(e) => {
            warn!(error = %e, "Credential store unreadable, continuing signed out");
            None
        }
    }
}

/// Which backend holds the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Keyring,
    #[default]
    File,
}

/// Build the configured store. `data_dir` is only used by the file backend.
pub fn open_store(backend: CredentialBackend, data_dir: &Path) -> Arc<dyn CredentialStore> {
    match backend {
        CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
        CredentialBackend::File => Arc::new(FileCredentialStore::new(data_dir)),
    }
}

// ============================================================================
// OS keychain
// ============================================================================

pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, STORAGE_KEY)?)
    }
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save(&self, token: &str) -> Result<(), StoreError> {
        self.entry()?.set_password(token)?;
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Plain file in the data directory
// ============================================================================

pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(STORAGE_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)?;
        restrict_permissions(&self.path)?;
        debug!(path = %self.path.display(), "Credential saved");
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-lifetime store, used for ephemeral sessions and as a test double.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> Result<(), StoreError> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        let slot = self
            .token
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(slot.clone())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self
            .token
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        *slot = None;
        Ok(())
    }
}
