//! Key/value store shared by the durable and session tiers.
//!
//! [`Store`] is the one place the shell reads and writes persisted state.
//! Values are stored as raw strings (the way browser storage holds them) and
//! decoded as JSON on read.
//!
//! # Contract
//!
//! - `get` of a missing key, or of a value that is not valid JSON, returns
//!   `None`. Callers always supply their own default.
//! - `set` never fails the caller. A failed write is logged at `warn` and the
//!   previous value stays in place: the cache is only replaced once the
//!   backend has accepted the new snapshot.
//! - The cache write lock is held across the backend save, so a
//!   read-modify-write against one key cannot interleave with another write.
//!   There is no transaction spanning several keys.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::state_persistence::{
    MemoryStorage, Snapshot, StorageBackend, StorageError, StorageResult, snapshot_bytes,
};

/// Lifetime of the values in a [`Store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTier {
    /// Survives reloads and restarts.
    Durable,
    /// Discarded when the session ends.
    Session,
}

impl StoreTier {
    /// Lower-case name for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Durable => "durable",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for StoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-through key/value store over a [`StorageBackend`].
pub struct Store {
    tier: StoreTier,
    backend: Box<dyn StorageBackend>,
    cache: RwLock<Snapshot>,
}

impl Store {
    /// Open a store and load whatever the backend holds.
    ///
    /// A backend that fails to load (corrupt file, I/O error) is logged and
    /// the store starts empty; the first successful write replaces the bad
    /// data.
    #[must_use]
    pub fn open(tier: StoreTier, backend: Box<dyn StorageBackend>) -> Self {
        let entries = match backend.load_all() {
            Ok(entries) => {
                tracing::debug!(
                    tier = %tier,
                    backend = backend.name(),
                    count = entries.len(),
                    "loaded store"
                );
                entries
            }
            Err(error) => {
                tracing::warn!(
                    tier = %tier,
                    backend = backend.name(),
                    %error,
                    "failed to load store, starting empty"
                );
                HashMap::new()
            }
        };

        Self {
            tier,
            backend,
            cache: RwLock::new(entries),
        }
    }

    /// Open a durable-tier store.
    #[must_use]
    pub fn durable(backend: Box<dyn StorageBackend>) -> Self {
        Self::open(StoreTier::Durable, backend)
    }

    /// Open a session-tier store.
    #[must_use]
    pub fn session(backend: Box<dyn StorageBackend>) -> Self {
        Self::open(StoreTier::Session, backend)
    }

    /// Create a store over fresh memory storage (ephemeral, for testing).
    #[must_use]
    pub fn in_memory(tier: StoreTier) -> Self {
        Self::open(tier, Box::new(MemoryStorage::new()))
    }

    /// Create a store over file storage at the given path.
    #[cfg(feature = "file-storage")]
    #[must_use]
    pub fn with_file(tier: StoreTier, path: impl AsRef<std::path::Path>) -> Self {
        Self::open(tier, Box::new(crate::state_persistence::FileStorage::new(path)))
    }

    /// Re-read the backend, replacing the cache.
    pub fn reload(&self) -> StorageResult<usize> {
        let entries = self.backend.load_all()?;
        let count = entries.len();
        let mut cache = self
            .cache
            .write()
            .map_err(|_| StorageError::Corruption("cache lock poisoned".into()))?;
        *cache = entries;
        Ok(count)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Raw stored string for `key`.
    #[must_use]
    pub fn get_raw(&self, key: &str) -> Option<String> {
        let cache = self.cache.read().ok()?;
        cache.get(key).cloned()
    }

    /// Stored value for `key`, decoded as JSON.
    ///
    /// Malformed values read as absent.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(tier = %self.tier, key, %error, "stored value is not valid JSON");
                None
            }
        }
    }

    /// Stored value for `key`, decoded into `T`.
    ///
    /// Missing values, malformed JSON, and shape mismatches all read as absent.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get_raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::debug!(
                    tier = %self.tier,
                    key,
                    %error,
                    "stored value does not decode, treating as absent"
                );
                None
            }
        }
    }

    /// Like [`get_as`](Self::get_as) but falls back to `T::default()`.
    #[must_use]
    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get_as(key).unwrap_or_default()
    }

    /// Whether a value is stored under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.cache
            .read()
            .map(|c| c.contains_key(key))
            .unwrap_or(false)
    }

    // ── Writes ───────────────────────────────────────────────────────────

    /// Store a raw string, returning the backend error on failure.
    pub fn try_set_raw(&self, key: &str, value: impl Into<String>) -> StorageResult<()> {
        let value = value.into();
        self.mutate(|next| {
            next.insert(key.to_string(), value);
        })
    }

    /// Serialize `value` as JSON and store it, returning errors.
    pub fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(format!("failed to encode {key}: {e}")))?;
        self.try_set_raw(key, raw)
    }

    /// Store a raw string. Failures are logged, never returned.
    pub fn set_raw(&self, key: &str, value: impl Into<String>) {
        if let Err(error) = self.try_set_raw(key, value) {
            self.log_write_failure(key, &error);
        }
    }

    /// Serialize and store `value`. Failures are logged, never returned.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if let Err(error) = self.try_set(key, value) {
            self.log_write_failure(key, &error);
        }
    }

    /// Remove `key`. Returns whether a value was removed and persisted.
    pub fn remove(&self, key: &str) -> bool {
        if !self.contains_key(key) {
            return false;
        }
        match self.mutate(|next| {
            next.remove(key);
        }) {
            Ok(()) => true,
            Err(error) => {
                self.log_write_failure(key, &error);
                false
            }
        }
    }

    /// Remove every entry from both the cache and the backend.
    pub fn clear(&self) -> StorageResult<()> {
        self.backend.clear()?;
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
        tracing::debug!(tier = %self.tier, "cleared store");
        Ok(())
    }

    fn mutate(&self, apply: impl FnOnce(&mut Snapshot)) -> StorageResult<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| StorageError::Corruption("cache lock poisoned".into()))?;
        let mut next = cache.clone();
        apply(&mut next);
        self.backend.save_all(&next)?;
        *cache = next;
        Ok(())
    }

    fn log_write_failure(&self, key: &str, error: &StorageError) {
        tracing::warn!(
            tier = %self.tier,
            backend = self.backend.name(),
            key,
            %error,
            "store write failed, keeping previous value"
        );
    }

    // ── Introspection ────────────────────────────────────────────────────

    /// Tier of this store.
    #[must_use]
    pub fn tier(&self) -> StoreTier {
        self.tier
    }

    /// Get the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get all cached keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .cache
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Get the backend name for logging.
    #[must_use]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Check if the storage backend is available.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Wrap in Arc for shared ownership.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("tier", &self.tier)
            .field("backend", &self.backend.name())
            .field("entries", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics and Diagnostics
// ─────────────────────────────────────────────────────────────────────────────

/// Statistics about a store.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStats {
    /// Tier of the store.
    pub tier: &'static str,
    /// Number of entries in cache.
    pub entry_count: usize,
    /// Total bytes of keys and values.
    pub total_bytes: usize,
    /// Backend name.
    pub backend: String,
}

impl Store {
    /// Get statistics about the store.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let (entry_count, total_bytes) = self
            .cache
            .read()
            .map(|c| (c.len(), snapshot_bytes(&c)))
            .unwrap_or((0, 0));

        StoreStats {
            tier: self.tier.as_str(),
            entry_count,
            total_bytes,
            backend: self.backend.name().to_string(),
        }
    }
}
