//! Persisted local state.
//!
//! A flat string-to-string map holding the usage counter, the optional
//! credential and the client fingerprint. `increment` performs the
//! read-increment-write under a single lock so concurrent callers in one
//! process never lose an update.

use crate::error::StoreError;
use skillchain_core::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

/// Key-value store for client state.
pub trait StateStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically increments the counter under `key` and returns the new value.
    ///
    /// A missing key counts as zero.
    fn increment(&self, key: &str) -> Result<u32, StoreError>;
}

fn parse_counter(key: &str, value: Option<&String>) -> std::result::Result<u32, StoreError> {
    match value {
        None => Ok(0),
        Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| {
            StoreError::Corrupt {
                key: Some(key.to_string()),
                details: e.to_string(),
            }
        }),
    }
}

/// In-memory store, used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }

    fn increment(&self, key: &str) -> Result<u32, StoreError> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        let next = parse_counter(key, values.get(key))?.saturating_add(1);
        values.insert(key.to_string(), next.to_string());
        Ok(next)
    }
}

/// Store backed by a JSON object on disk.
///
/// The file is read once on open and rewritten after every mutation. A
/// missing file is an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read, and `Corrupt` if
    /// it is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                key: None,
                details: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    details: e.to_string(),
                }
                .into());
            }
        };
        debug!(path = %path.display(), keys = values.len(), "opened state file");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        let io_error = |e: std::io::Error| StoreError::Io {
            path: self.path.display().to_string(),
            details: e.to_string(),
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(values).map_err(|e| StoreError::Corrupt {
            key: None,
            details: e.to_string(),
        })?;
        fs::write(&self.path, contents).map_err(io_error)?;
        Ok(())
    }
}

impl StateStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut staged = values.clone();
        staged.insert(key.to_string(), value.to_string());
        self.persist(&staged)?;
        *values = staged;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut staged = values.clone();
        staged.remove(key);
        self.persist(&staged)?;
        *values = staged;
        Ok(())
    }

    fn increment(&self, key: &str) -> Result<u32, StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let next = parse_counter(key, values.get(key))?.saturating_add(1);
        let mut staged = values.clone();
        staged.insert(key.to_string(), next.to_string());
        self.persist(&staged)?;
        *values = staged;
        Ok(next)
    }
}
