//! Client-local key/value storage.
//!
//! Every persisted value goes through a [`StorageAdapter`]; the entitlement
//! and hand-off stores are the only callers. Writes are synchronous: when
//! `set` returns `Ok`, the value is durable. A failed `set` or `remove`
//! leaves the stored values as they were.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{AppError, Result};

/// Storage keys
pub mod keys {
    pub const ENTITLEMENT_GRANTED: &str = concat!("qrstudio:", "entitlement.granted");
    pub const ENTITLEMENT_GRANTED_AT: &str = concat!("qrstudio:", "entitlement.grantedAt");
    pub const HANDOFF_PENDING_CONFIG: &str = concat!("qrstudio:", "handoff.pendingConfig");
}

/// Storage adapter trait for custom storage implementations
pub trait StorageAdapter: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &str) -> Option<String>;

    /// Set a value by key
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value by key
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory storage, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .map_err(|_| AppError::Internal("storage lock poisoned".into()))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .map_err(|_| AppError::Internal("storage lock poisoned".into()))?
            .remove(key);
        Ok(())
    }
}

/// File-based storage adapter
///
/// Stores values in `qrstudio.json` within the given directory, rewriting the
/// whole file on every change.
pub struct FileStorage {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    pub const FILE_NAME: &'static str = "qrstudio.json";

    /// Opens (creating if needed) the store in `storage_dir`.
    ///
    /// An unreadable or corrupt file starts an empty store instead of failing.
    pub fn open(storage_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(storage_dir)?;
        let path = storage_dir.join(Self::FILE_NAME);

        let cache = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt storage file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `values` to a sibling temp file, then renames it over the store.
    fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");

        let written =
            std::fs::write(&tmp, contents).and_then(|_| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Applies `apply` to a copy of the cache and keeps it only once it is on disk.
    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| AppError::Internal("storage lock poisoned".into()))?;

        let mut next = cache.clone();
        apply(&mut next);
        self.save(&next)?;

        *cache = next;
        Ok(())
    }
}

impl StorageAdapter for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|cache| {
            cache.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|cache| {
            cache.remove(key);
        })
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish()
    }
}
