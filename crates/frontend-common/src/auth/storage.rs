//! Durable token storage

use super::state::AccessToken;
use phulong_core::{CoreError, CoreResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persists the raw token under a single key
///
/// Absence of the key means "no session".
pub trait TokenStorage: Send + Sync {
    fn load(&self) -> CoreResult<Option<AccessToken>>;
    fn store(&self, token: &AccessToken) -> CoreResult<()>;
    fn clear(&self) -> CoreResult<()>;
}

/// Process-local storage, lost on exit
#[derive(Debug)]
pub struct MemoryTokenStorage {
    key: String,
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: Mutex::new(HashMap::new()),
        }
    }

    /// Start with a token already stored, as after a previous visit
    pub fn with_token(key: impl Into<String>, token: impl Into<String>) -> Self {
        let storage = Self::new(key);
        if let Ok(mut values) = storage.values.lock() {
            values.insert(storage.key.clone(), token.into());
        }
        storage
    }

    /// Whether the storage key is present
    pub fn contains_key(&self) -> bool {
        self.values
            .lock()
            .map(|values| values.contains_key(&self.key))
            .unwrap_or(false)
    }

    fn values(&self) -> CoreResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| CoreError::storage_error("token storage lock poisoned"))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> CoreResult<Option<AccessToken>> {
        Ok(self.values()?.get(&self.key).cloned().map(AccessToken::new))
    }

    fn store(&self, token: &AccessToken) -> CoreResult<()> {
        self.values()?
            .insert(self.key.clone(), token.as_str().to_string());
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        self.values()?.remove(&self.key);
        Ok(())
    }
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(key),
        }
    }

    /// Store under the platform data directory (e.g. `~/.local/share/phulong`)
    ///
    /// # Errors
    ///
    /// Returns an error if the platform directories cannot be determined
    pub fn in_data_dir(key: &str) -> CoreResult<Self> {
        let dirs = directories::ProjectDirs::from("vn", "Phu Long", "phulong").ok_or_else(|| {
            CoreError::storage_error("platform data directory could not be determined")
        })?;
        Ok(Self::new(dirs.data_dir(), key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> CoreResult<Option<AccessToken>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| AccessToken::new(token)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, token: &AccessToken) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token.as_str())?;
        Ok(())
    }

    fn clear(&self) -> CoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryTokenStorage::new("admin_token");
        assert_eq!(storage.load().unwrap(), None);

        storage.store(&AccessToken::new("abc")).unwrap();
        assert!(storage.contains_key());
        assert_eq!(storage.load().unwrap(), Some(AccessToken::new("abc")));

        storage.clear().unwrap();
        assert!(!storage.contains_key());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileTokenStorage::new(dir.path().join("nested"), "admin_token");
        first.store(&AccessToken::new("abc")).unwrap();

        let second = FileTokenStorage::new(dir.path().join("nested"), "admin_token");
        assert_eq!(second.load().unwrap(), Some(AccessToken::new("abc")));

        second.clear().unwrap();
        assert!(!first.path().exists());
        assert_eq!(first.load().unwrap(), None);
    }

    #[test]
    fn clearing_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path(), "admin_token");
        storage.clear().unwrap();
    }

    #[test]
    fn blank_file_means_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileTokenStorage::new(dir.path(), "admin_token");
        std::fs::write(storage.path(), "\n").unwrap();
        assert_eq!(storage.load().unwrap(), None);
    }
}
