//! API key persistence and the prompt state machine guarding it.

use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::RwLock;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::error::ClientError;

/// Key the API key is stored under.
pub const CREDENTIAL_KEY: &str = "api_key";
pub const CREDENTIAL_FILE_NAME: &str = "credentials.json";

#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: &str) -> Result<Self, ClientError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClientError::validation("API key must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Credential shared between the prompt (single writer) and the gateway.
pub type CredentialHandle = Arc<RwLock<Option<Credential>>>;

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, ClientError>;
    fn save(&self, credential: &Credential) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file holding `{"api_key": "..."}`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(CREDENTIAL_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, ClientError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|err| {
            ClientError::Storage(format!(
                "credential file '{}' is not valid JSON: {err}",
                self.path.display()
            ))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                ClientError::Storage(format!(
                    "failed to create credential directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }
        let serialized = serde_json::to_string_pretty(entries)
            .map_err(|err| ClientError::Storage(err.to_string()))?;
        fs::write(&self.path, serialized)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), ClientError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), ClientError> {
    Ok(())
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, ClientError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(CREDENTIAL_KEY)
            .and_then(|raw| Credential::new(raw).ok()))
    }

    fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        let mut entries = self.read_entries().unwrap_or_else(|err| {
            warn!(path = %self.path.display(), "overwriting unreadable credential file: {err}");
            BTreeMap::new()
        });
        entries.insert(CREDENTIAL_KEY.to_string(), credential.expose().to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), ClientError> {
        let mut entries = self.read_entries()?;
        if entries.remove(CREDENTIAL_KEY).is_none() {
            return Ok(());
        }
        if entries.is_empty() {
            fs::remove_file(&self.path)?;
            return Ok(());
        }
        self.write_entries(&entries)
    }
}

/// Process-local store. Clones share the same slot, which lets tests
/// simulate a reload by building a second session over the same store.
#[derive(Default, Clone)]
pub struct MemoryCredentialStore {
    slot: Arc<std::sync::Mutex<Option<String>>>,
}

impl MemoryCredentialStore {
    fn with_slot<T>(&self, f: impl FnOnce(&mut Option<String>) -> T) -> Result<T, ClientError> {
        let mut guard = self
            .slot
            .lock()
            .map_err(|_| ClientError::Storage("in-memory credential slot poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, ClientError> {
        self.with_slot(|slot| slot.as_deref().and_then(|raw| Credential::new(raw).ok()))
    }

    fn save(&self, credential: &Credential) -> Result<(), ClientError> {
        self.with_slot(|slot| *slot = Some(credential.expose().to_string()))
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.with_slot(|slot| *slot = None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptState {
    Unset,
    Set,
}

/// Gatekeeper for the API key. While `Unset`, the front end must ask the
/// user for a key before doing anything else.
pub struct CredentialPrompt {
    store: Arc<dyn CredentialStore>,
    handle: CredentialHandle,
}

impl CredentialPrompt {
    /// Reads the persisted key once and publishes it to `handle`. An
    /// unreadable store starts the prompt `Unset`; the next `submit`
    /// overwrites it.
    pub async fn initialize(
        store: Arc<dyn CredentialStore>,
        handle: CredentialHandle,
    ) -> Result<Self, ClientError> {
        let stored = match store.load() {
            Ok(stored) => stored,
            Err(ClientError::Storage(message)) => {
                warn!("ignoring unreadable stored API key: {message}");
                None
            }
            Err(err) => return Err(err),
        };
        if stored.is_some() {
            info!("loaded stored API key");
        }
        *handle.write().await = stored;
        Ok(Self { store, handle })
    }

    pub async fn state(&self) -> PromptState {
        if self.handle.read().await.is_some() {
            PromptState::Set
        } else {
            PromptState::Unset
        }
    }

    pub async fn submit(&self, raw: &str) -> Result<(), ClientError> {
        let credential = Credential::new(raw)?;
        self.store.save(&credential)?;
        *self.handle.write().await = Some(credential);
        info!("API key saved");
        Ok(())
    }

    /// Drops the active key so the prompt is shown again.
    pub async fn invalidate(&self) -> Result<(), ClientError> {
        self.handle.write().await.take();
        self.store.clear()?;
        info!("API key cleared");
        Ok(())
    }
}
