use crate::types::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Stored form of every value: the payload plus an optional expiry in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: Value,
    #[serde(default)]
    pub expiry: Option<i64>,
}

impl StoredEntry {
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        matches!(self.expiry, Some(expiry) if now_ms >= expiry)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Key-value store for client-side UI state.
///
/// Reading an entry past its expiry evicts it and returns nothing. When opened on a
/// file, every change is written back as one JSON object keyed by entry name.
#[derive(Debug, Default)]
pub struct ExpiringStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    path: Option<PathBuf>,
}

impl ExpiringStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the store from `path`. A missing file starts empty, and so does an
    /// unreadable one (after a warning) since the contents are only cached UI state.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries: HashMap<String, StoredEntry> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable store {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StoredEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key`, expiring after `ttl` if given.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        let expiry = ttl.map(|ttl| {
            now_ms().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
        });
        self.insert(
            key,
            StoredEntry {
                value: serde_json::to_value(value)?,
                expiry,
            },
        )
    }

    pub fn insert(&self, key: &str, entry: StoredEntry) -> Result<()> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), entry);
        self.persist(&entries)
    }

    /// Decoded value under `key`, or `None` if absent, expired or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_at(key, now_ms())?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!("Stored value for '{}' has an unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Raw value under `key` as seen at `now_ms`.
    pub fn get_at(&self, key: &str, now_ms: i64) -> Option<Value> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;

        if entry.is_expired_at(now_ms) {
            entries.remove(key);
            if let Err(e) = self.persist(&entries) {
                tracing::warn!("Could not persist eviction of '{}': {}", key, e);
            }
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    /// Drops every expired entry and returns how many went.
    pub fn purge_expired(&self) -> Result<usize> {
        let now = now_ms();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let purged = before - entries.len();
        if purged > 0 {
            self.persist(&entries)?;
        }
        Ok(purged)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Writes the current contents to the backing file, if any.
    pub fn flush(&self) -> Result<()> {
        let entries = self.lock();
        self.persist(&entries)
    }

    fn persist(&self, entries: &HashMap<String, StoredEntry>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}
