use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Credentials file name in cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Suffix of the scratch file a new record is written to before it replaces the old one
const TEMP_SUFFIX: &str = "tmp";

/// The only keys the client ever persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Token,
    Username,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Token => "token",
            StorageKey::Username => "username",
        }
    }
}

/// Synchronous key-value storage that survives process restarts.
///
/// Every call is a single-key operation; there are no multi-key transactions.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Result<Option<String>>;
    fn set(&self, key: StorageKey, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: StorageKey) -> Result<()>;
}

/// JSON file in the cache directory holding the credential record.
pub struct FileStore {
    cache_dir: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lock: Mutex::new(()),
        }
    }

    fn credentials_path(&self) -> PathBuf {
        self.cache_dir.join(CREDENTIALS_FILE)
    }

    fn read_record(&self) -> Result<HashMap<String, String>> {
        let path = self.credentials_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&path).context("Failed to read credentials file")?;
        serde_json::from_str(&contents).context("Failed to parse credentials file")
    }

    /// Current record for a read-modify-write. A record that cannot be parsed
    /// is discarded so the next write replaces it.
    fn read_record_for_update(&self) -> Result<HashMap<String, String>> {
        match self.read_record() {
            Ok(record) => Ok(record),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!(error = %e, "Discarding unreadable credentials file");
                Ok(HashMap::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_record(&self, record: &HashMap<String, String>) -> Result<()> {
        let path = self.credentials_path();
        if record.is_empty() {
            if path.exists() {
                fs::remove_file(&path).context("Failed to remove credentials file")?;
            }
            return Ok(());
        }
        let contents = serde_json::to_string_pretty(record)?;
        atomic_write(&path, contents.as_bytes()).context("Failed to write credentials file")
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>> {
        let _guard = self.guard();
        Ok(self.read_record()?.remove(key.as_str()))
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<()> {
        let _guard = self.guard();
        let mut record = self.read_record_for_update()?;
        record.insert(key.as_str().to_string(), value.to_string());
        self.write_record(&record)
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        let _guard = self.guard();
        let path = self.credentials_path();
        let mut record = match self.read_record() {
            Ok(record) => record,
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                warn!(error = %e, "Removing unreadable credentials file");
                return self.write_record(&HashMap::new());
            }
            Err(e) => return Err(e),
        };
        if record.remove(key.as_str()).is_some() {
            debug!(key = key.as_str(), path = %path.display(), "Removed stored credential");
            self.write_record(&record)?;
        }
        Ok(())
    }
}

/// Write to a sibling temp file, sync it, then rename over `path` so readers
/// never see a partial record.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp_path = path.with_extension(format!(
        "{}.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        TEMP_SUFFIX
    ));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(&temp_path)?);
    writer.write_all(data)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;

    fs::rename(&temp_path, path)
}

/// Process-local store; nothing outlives the process.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<StorageKey, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>> {
        Ok(self.values().get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<()> {
        self.values().insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        self.values().remove(&key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
