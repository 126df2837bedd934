use super::{KeyValueStore, StorageError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key-value store kept as one JSON document on disk.
///
/// Every write replaces the whole document through a temp file and a rename,
/// so a multi-key removal is seen by readers as a single change.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

pub fn default_store_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"));
    config_dir.join("saldo-client").join("session.json")
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(data)?)?;
        std::fs::rename(&tmp, &self.path)?;

        log::debug!("Session store saved to {:?}", self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut data = self.load()?;
        data.insert(key.to_string(), value.to_string());
        self.persist(&data)
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut data = self.load()?;
        let before = data.len();
        for key in keys {
            data.remove(*key);
        }
        if data.len() == before {
            return Ok(());
        }
        self.persist(&data)
    }
}
