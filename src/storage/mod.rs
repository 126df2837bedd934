//! Durable session storage
//!
//! The access token and a snapshot of the client profile live in a small
//! key-value store that survives restarts. Key names are part of the on-disk
//! format and must not change between releases.

pub mod file;
pub mod keychain;
pub mod memory;

use crate::api::Profile;
use std::sync::Arc;
use thiserror::Error;

pub use file::FileStore;
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

pub const TOKEN_KEY: &str = "@auth_token";
pub const PROFILE_KEY: &str = "@client_data";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Keychain error: {0}")]
    KeyringError(String),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove every key in `keys`. Backends that can do so apply this as a
    /// single write.
    fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;
}

/// Token and profile persistence on top of a [`KeyValueStore`].
#[derive(Clone)]
pub struct TokenStorage {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub fn save_token(&self, token: &str) -> Result<(), StorageError> {
        self.store.set(TOKEN_KEY, token)
    }

    /// The stored token exactly as saved, empty strings included.
    pub fn token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(TOKEN_KEY)
    }

    /// The stored token if it can authenticate a request.
    pub fn usable_token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token()?.filter(|t| !t.is_empty()))
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let json = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &json)
    }

    pub fn profile(&self) -> Result<Option<Profile>, StorageError> {
        match self.store.get(PROFILE_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Drop token and profile together.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&[TOKEN_KEY, PROFILE_KEY])?;
        log::info!("Stored session cleared");
        Ok(())
    }

    pub fn has_stored_session(&self) -> bool {
        match self.usable_token() {
            Ok(token) => token.is_some(),
            Err(e) => {
                log::error!("Error reading stored token: {}", e);
                false
            }
        }
    }

    /// Run `op` on the blocking thread pool. File and keychain backends do
    /// synchronous I/O.
    pub async fn blocking<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: FnOnce(&TokenStorage) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|e| StorageError::IoError(std::io::Error::other(e.to_string())))?
    }
}
