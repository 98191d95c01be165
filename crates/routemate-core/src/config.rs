//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: where
//! the API lives, where credentials are kept, and the last used username.
//!
//! Configuration is stored at `~/.config/routemate/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{DEFAULT_API_BASE_URL, DEFAULT_LOGIN_PATH};
use crate::auth::{DurableStore, FileStore, KeyringStore, MemoryStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "routemate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides the configured API base URL
pub const API_URL_ENV: &str = "ROUTEMATE_API_URL";

/// Where the credential record (`token`, `username`) is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Nothing persisted; the session ends with the process
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub login_path: Option<String>,
    pub credential_backend: CredentialBackend,
    /// Unset means no client-side timeout
    pub request_timeout_secs: Option<u64>,
    pub last_username: Option<String>,
    pub log_to_file: bool,
    /// Runtime override (env or command line); never written back
    #[serde(skip)]
    pub(crate) api_url_override: Option<String>,
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::config_path()?)?;
        Ok(match std::env::var(API_URL_ENV) {
            Ok(url) => config.with_api_url_override(&url),
            Err(_) => config,
        })
    }

    /// Point this run at another server without touching the saved file.
    /// An empty URL is ignored.
    pub fn with_api_url_override(mut self, url: &str) -> Self {
        if !url.is_empty() {
            self.api_url_override = Some(url.to_string());
        }
        self
    }

    /// Record the last signed-in user in the file on disk.
    ///
    /// Works on a fresh copy of the file so runtime overrides and defaults
    /// never replace what the user saved. Fails without writing if the file
    /// cannot be read.
    pub fn remember_username(username: &str) -> Result<()> {
        Self::remember_username_at(&Self::config_path()?, username)
    }

    pub fn remember_username_at(path: &Path, username: &str) -> Result<()> {
        let mut config = Self::load_from(path)?;
        config.last_username = Some(username.to_string());
        config.save_to(path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Override, then saved value, then the development default
    pub fn api_base_url(&self) -> String {
        self.api_url_override
            .clone()
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn login_path(&self) -> String {
        self.login_path
            .clone()
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Open the durable store selected by `credential_backend`
    pub fn open_store(&self) -> Result<Arc<dyn DurableStore>> {
        Ok(match self.credential_backend {
            CredentialBackend::File => Arc::new(FileStore::new(self.cache_dir()?)),
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
            CredentialBackend::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();

        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
        assert_eq!(config.login_path(), DEFAULT_LOGIN_PATH);
        assert_eq!(config.credential_backend, CredentialBackend::File);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base_url: Some("https://routes.example.com/api".to_string()),
            credential_backend: CredentialBackend::Keyring,
            request_timeout_secs: Some(15),
            last_username: Some("alice".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url(), "https://routes.example.com/api");
        assert_eq!(loaded.credential_backend, CredentialBackend::Keyring);
        assert_eq!(loaded.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(loaded.last_username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_api_url_override_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            api_base_url: Some("https://routes.example.com/api".to_string()),
            ..Config::default()
        }
        .with_api_url_override("http://one-off.example/api");
        assert_eq!(config.api_base_url(), "http://one-off.example/api");

        config.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.api_base_url(), "https://routes.example.com/api");

        let unchanged = Config::default().with_api_url_override("");
        assert_eq!(unchanged.api_base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_remember_username_keeps_saved_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_base_url": "https://routes.example.com/api", "log_to_file": true}"#,
        )
        .unwrap();

        Config::remember_username_at(&path, "alice").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_username.as_deref(), Some("alice"));
        assert_eq!(loaded.api_base_url(), "https://routes.example.com/api");
        assert!(loaded.log_to_file);
    }

    #[test]
    fn test_remember_username_leaves_unreadable_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ hand-edited, not json").unwrap();

        assert!(Config::remember_username_at(&path, "alice").is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{ hand-edited, not json"
        );
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"credential_backend": "memory"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.credential_backend, CredentialBackend::Memory);
        assert!(!config.log_to_file);
        assert!(config.open_store().is_ok());
    }
}
