use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::atomic::{atomic_write, quarantine};
use super::types::StorageError;

// ============================================================================
// Store
// ============================================================================

/// Flat string→string document persisted as one JSON object.
///
/// Values are opaque strings, usually JSON-encoded by the caller; the store
/// never interprets them, which is what lets the registry recover legacy
/// encodings that are not valid JSON at all.
///
/// Cloning is cheap and every clone shares the same document, so each
/// component can hold its own handle. Writes update memory first and then
/// flush the whole document; a failed flush is reported but the in-memory
/// value stays.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl Store {
    /// Open the document at `path`, failing soft.
    ///
    /// - Missing file → empty store
    /// - Unreadable or unparseable file → quarantined, empty store
    /// - Non-string values → kept as their JSON text
    pub fn open(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(
                &content,
            ) {
                Ok(raw) => raw
                    .into_iter()
                    .map(|(key, value)| match value {
                        serde_json::Value::String(s) => (key, s),
                        other => (key, other.to_string()),
                    })
                    .collect(),
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Storage document is corrupt, starting empty"
                    );
                    quarantine(path);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No storage document yet");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read storage document");
                BTreeMap::new()
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened storage");

        Self {
            inner: Arc::new(Mutex::new(Inner {
                path: Some(path.to_path_buf()),
                entries,
            })),
        }
    }

    /// A store that never touches the filesystem (tests, `--data-dir` failures).
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                path: None,
                entries: BTreeMap::new(),
            })),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    /// Set a raw value and flush.
    pub fn set(&self, key: &str, value: impl Into<String>) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.entries.insert(key.to_string(), value.into());
        inner.flush()
    }

    /// JSON-encode `value` and store it under `key`.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value)?;
        self.set(key, encoded)
    }

    /// Remove `key` and flush. Removing a missing key is a no-op write.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock();
        if inner.entries.remove(key).is_none() {
            return Ok(());
        }
        inner.flush()
    }

    /// Drop every key and flush an empty document.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.flush()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Single writer; a panic mid-update leaves a consistent map behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn flush(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded = serde_json::to_vec_pretty(&self.entries)?;
        atomic_write(path, &encoded).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist storage");
        })
    }
}

impl std::fmt::Debug for Store {
    // Values can hold credentials; only show the shape.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Store")
            .field("path", &inner.path)
            .field("keys", &inner.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
