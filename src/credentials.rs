//! Storage and gating of the single API credential.

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Key under which the credential is persisted.
pub const STORAGE_KEY: &str = "gemini_api_key";

/// Prefix every Google AI Studio key carries.
pub const KEY_PREFIX: &str = "AIza";

pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<String>>;
    fn set(&self, credential: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// JSON key/value file, e.g. `~/.banana-studio/credentials.json`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(STORAGE_KEY))
    }

    fn set(&self, credential: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(STORAGE_KEY.to_string(), credential.to_string());
        self.write_entries(&entries)?;
        debug!("Stored credential in {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(STORAGE_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// In-process store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(credential.into())),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>> {
        self.value
            .lock()
            .map_err(|_| Error::Invariant("credential store lock poisoned".to_string()))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.lock()?.clone())
    }

    fn set(&self, credential: &str) -> Result<()> {
        *self.lock()? = Some(credential.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock()? = None;
        Ok(())
    }
}

/// Trim and sanity-check a user-entered key.
pub fn validate_key(raw: &str) -> Result<String> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(Error::MissingCredential);
    }
    if !key.starts_with(KEY_PREFIX) {
        return Err(Error::InvalidCredential);
    }
    Ok(key.to_string())
}

/// Key baked in at compile time through `BANANA_API_KEY`, if any.
pub fn build_time_key() -> Option<String> {
    option_env!("BANANA_API_KEY")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

/// Which top-level flow the user is routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    CredentialEntry,
    Main { credential: String },
}

/// Resolves the credential from the store, then from a fallback value.
pub struct CredentialGate {
    store: Box<dyn CredentialStore>,
    fallback: Option<String>,
}

impl CredentialGate {
    pub fn new(store: Box<dyn CredentialStore>, fallback: Option<String>) -> Self {
        Self { store, fallback }
    }

    pub fn resolve(&self) -> Result<Option<String>> {
        if let Some(stored) = self.store.get()?.filter(|c| !c.trim().is_empty()) {
            return Ok(Some(stored));
        }
        Ok(self.fallback.clone().filter(|c| !c.trim().is_empty()))
    }

    pub fn screen(&self) -> Result<Screen> {
        Ok(match self.resolve()? {
            Some(credential) => Screen::Main { credential },
            None => Screen::CredentialEntry,
        })
    }

    /// The credential, or [`Error::MissingCredential`] when none is available.
    pub fn require(&self) -> Result<String> {
        self.resolve()?.ok_or(Error::MissingCredential)
    }

    pub fn login(&self, raw: &str) -> Result<String> {
        let key = validate_key(raw)?;
        self.store.set(&key)?;
        info!("API key saved");
        Ok(key)
    }

    /// Forget the stored credential. A build-time fallback still applies afterwards.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("API key removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "AIzaSyTestKey123";

    #[test]
    fn test_validate_key() {
        assert_eq!(validate_key(&format!("  {}\n", KEY)).unwrap(), KEY);
        assert!(matches!(validate_key("   "), Err(Error::MissingCredential)));
        assert!(matches!(
            validate_key("sk-not-a-google-key"),
            Err(Error::InvalidCredential)
        ));
    }

    #[test]
    fn test_file_store_round_trip_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.json");
        let store = FileCredentialStore::new(&path);

        assert_eq!(store.get().unwrap(), None);
        store.set(KEY).unwrap();
        assert!(path.exists());
        assert_eq!(store.get().unwrap(), Some(KEY.to_string()));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains(STORAGE_KEY));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_keeps_other_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();
        let store = FileCredentialStore::new(&path);

        store.set(KEY).unwrap();
        store.clear().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("dark"));
        assert!(!raw.contains(KEY));
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        fs::write(&path, "not json").unwrap();

        let err = FileCredentialStore::new(&path).get().unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_gate_routes_to_entry_without_credential() {
        let gate = CredentialGate::new(Box::new(MemoryCredentialStore::new()), None);
        assert_eq!(gate.screen().unwrap(), Screen::CredentialEntry);
        assert!(matches!(gate.require(), Err(Error::MissingCredential)));
    }

    #[test]
    fn test_gate_prefers_stored_over_fallback() {
        let gate = CredentialGate::new(
            Box::new(MemoryCredentialStore::with_credential(KEY)),
            Some("AIzaFallback".to_string()),
        );
        assert_eq!(
            gate.screen().unwrap(),
            Screen::Main {
                credential: KEY.to_string()
            }
        );

        gate.logout().unwrap();
        assert_eq!(gate.require().unwrap(), "AIzaFallback");
    }

    #[test]
    fn test_gate_login_validates_before_storing() {
        let gate = CredentialGate::new(Box::new(MemoryCredentialStore::new()), None);

        assert!(matches!(gate.login("nope"), Err(Error::InvalidCredential)));
        assert_eq!(gate.resolve().unwrap(), None);

        assert_eq!(gate.login(KEY).unwrap(), KEY);
        assert_eq!(gate.resolve().unwrap(), Some(KEY.to_string()));
    }

    #[test]
    fn test_blank_stored_value_falls_through() {
        let gate = CredentialGate::new(
            Box::new(MemoryCredentialStore::with_credential("  ")),
            None,
        );
        assert_eq!(gate.screen().unwrap(), Screen::CredentialEntry);
    }
}
