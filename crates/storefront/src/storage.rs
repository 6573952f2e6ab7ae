//! Local key-value persistence for cart state and checkout details.
//!
//! The storefront mirrors its local state (cart lines, the shipping address
//! entered at checkout) into a single key-value slot so a new session can
//! pick up where the last one left off. Writes are best-effort: the in-memory state is
//! authoritative for the session, so persistence failures are logged and
//! never surfaced (see `cart::CartStore`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Well-known slot keys.
pub mod keys {
    /// Serialized cart line collection.
    pub const CART: &str = "cart";

    /// Shipping address saved during checkout.
    pub const SHIPPING_ADDRESS: &str = "shipping_address";
}

/// Errors from the underlying persistence medium.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds something other than a JSON string map.
    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string-keyed, string-valued persistence slot.
///
/// Implementations must be safe to share across the stores that write to
/// them; last writer wins, which is acceptable because all writers run on
/// the same application event flow.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Removing a missing key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// JsonFileStore
// =============================================================================

/// File-backed store: one JSON object of string entries per file.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or create) a store backed by `path`.
    ///
    /// A missing file starts empty. A corrupt file is treated as empty with
    /// a warning, matching the cart-loading behavior: local state is never
    /// allowed to wedge the application.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// existing file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<HashMap<String, String>>(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt store file");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(key.to_owned(), value.to_owned());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("cart").unwrap(), None);

        store.set("cart", "[]").unwrap();
        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[]"));

        store.remove("cart").unwrap();
        assert_eq!(store.get("cart").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set(keys::CART, "[{\"quantity\":1}]").unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(keys::CART).unwrap().as_deref(),
            Some("[{\"quantity\":1}]")
        );
    }

    #[test]
    fn test_file_store_remove_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
        store.remove("nothing-here").unwrap();
    }

    #[test]
    fn test_file_store_tolerates_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json at all {{{").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.get(keys::CART).unwrap(), None);
    }
}
