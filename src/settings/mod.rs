use crate::api::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::storage::{self, FileStore, KeyringStore, MemoryStore, TokenStorage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const KEYRING_SERVICE: &str = "saldo-client";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>, // file backend only
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub api_url: String,
    pub timeout_ms: u64,
    pub retry: RetrySettings,
    pub storage: StorageSettings,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry: RetrySettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_attempts,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    /// Apply `API_URL` and `API_TIMEOUT` overrides. A timeout that does not
    /// parse falls back to the default rather than failing startup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("API_URL").filter(|u| !u.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("API_TIMEOUT") {
            self.timeout_ms = match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    log::warn!("Ignoring invalid API_TIMEOUT {:?}", raw);
                    DEFAULT_TIMEOUT_MS
                }
            };
        }
    }

    pub fn open_storage(&self) -> TokenStorage {
        match self.storage.backend {
            StorageBackend::File => {
                let path = self
                    .storage
                    .path
                    .clone()
                    .unwrap_or_else(storage::file::default_store_path);
                TokenStorage::new(Arc::new(FileStore::new(path)))
            }
            StorageBackend::Keyring => {
                TokenStorage::new(Arc::new(KeyringStore::new(KEYRING_SERVICE)))
            }
            StorageBackend::Memory => TokenStorage::new(Arc::new(MemoryStore::default())),
        }
    }
}

fn get_settings_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"));
    config_dir.join("saldo-client").join("settings.json")
}

pub fn load_settings_from(path: &std::path::Path) -> Result<ClientSettings, SettingsError> {
    if !path.exists() {
        return Ok(ClientSettings::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

pub fn load_settings() -> Result<ClientSettings, SettingsError> {
    load_settings_from(&get_settings_path())
}

pub fn save_settings_to(
    settings: &ClientSettings,
    path: &std::path::Path,
) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, contents)?;

    log::info!("Settings saved to {:?}", path);
    Ok(())
}

/// Settings file plus `.env` and process environment overrides.
pub fn load() -> ClientSettings {
    if let Err(e) = dotenvy::dotenv() {
        log::debug!("No .env file loaded: {}", e);
    }

    let mut settings = load_settings().unwrap_or_else(|e| {
        log::warn!("Failed to load settings, using defaults: {}", e);
        ClientSettings::default()
    });
    settings.apply_env(|key| std::env::var(key).ok());
    settings
}
