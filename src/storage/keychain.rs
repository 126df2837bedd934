use super::{KeyValueStore, StorageError};

/// Stores each key as a separate OS keychain entry under one service name.
///
/// Removal walks the keys one by one; the keychain has no multi-entry
/// transaction.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, key)
            .map_err(|e| StorageError::KeyringError(e.to_string()))
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::KeyringError(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::KeyringError(e.to_string()))
    }

    fn remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            match self.entry(key)?.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(StorageError::KeyringError(e.to_string())),
            }
        }
        Ok(())
    }
}
