//! Storage backends for the portal's key/value stores.
//!
//! A backend persists a whole snapshot of `key -> raw string` entries, the
//! same shape a browser's `localStorage`/`sessionStorage` exposes. The
//! [`Store`](crate::store::Store) layered on top keeps an in-memory cache and
//! writes through to the backend on every mutation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Store                               │
//! │   - Durable or Session tier                                   │
//! │   - In-memory cache, write-through on every set/remove        │
//! │   - JSON decode on read; malformed values read as absent      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     StorageBackend                            │
//! │   - MemoryStorage: in-memory (testing, ephemeral sessions)    │
//! │   - FileStorage: JSON file (requires file-storage)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Invariants
//!
//! 1. **Graceful degradation**: Storage failures never panic; operations return `Result`.
//! 2. **Atomic writes**: File storage uses write-rename pattern to prevent corruption.
//! 3. **Quota enforcement**: A snapshot over the byte quota is rejected whole,
//!    leaving the previously saved snapshot in place.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `StorageError::Io` | File I/O failure | Returns error, previous file intact |
//! | `StorageError::Serialization` | JSON encode/decode | Returns error |
//! | `StorageError::QuotaExceeded` | Snapshot too large | Returns error, nothing written |
//! | `StorageError::Corruption` | Poisoned lock | Returns error |
//! | Missing file | First run | Empty snapshot |

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Storage is corrupted or a lock was poisoned.
    #[error("storage corruption: {0}")]
    Corruption(String),
    /// The snapshot does not fit in the backend's quota.
    #[error("storage quota exceeded: {needed} bytes needed, {limit} allowed")]
    QuotaExceeded {
        /// Bytes the rejected snapshot would occupy.
        needed: usize,
        /// Configured quota in bytes.
        limit: usize,
    },
    /// Backend is not available.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A full set of stored entries: canonical key to raw stored string.
pub type Snapshot = HashMap<String, String>;

/// Bytes a snapshot occupies for quota accounting (keys plus values).
#[must_use]
pub fn snapshot_bytes(entries: &Snapshot) -> usize {
    entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

fn check_quota(entries: &Snapshot, quota: Option<usize>) -> StorageResult<()> {
    if let Some(limit) = quota {
        let needed = snapshot_bytes(entries);
        if needed > limit {
            return Err(StorageError::QuotaExceeded { needed, limit });
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Backend Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for pluggable storage backends.
///
/// Implementations must be thread-safe (`Send + Sync`) so a store can be
/// shared behind an `Arc`.
///
/// # Implementation Notes
///
/// - `save_all` replaces all existing entries (not merge) and must be atomic:
///   on error the previously saved snapshot stays readable.
/// - `clear` removes all stored entries for this backend.
pub trait StorageBackend: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Load all stored entries.
    ///
    /// Returns an empty map if nothing has been stored yet.
    fn load_all(&self) -> StorageResult<Snapshot>;

    /// Save all entries atomically.
    fn save_all(&self, entries: &Snapshot) -> StorageResult<()>;

    /// Clear all stored entries.
    fn clear(&self) -> StorageResult<()>;

    /// Check if the backend is available and functional.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: StorageBackend + ?Sized> StorageBackend for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn load_all(&self) -> StorageResult<Snapshot> {
        (**self).load_all()
    }

    fn save_all(&self, entries: &Snapshot) -> StorageResult<()> {
        (**self).save_all(entries)
    }

    fn clear(&self) -> StorageResult<()> {
        (**self).clear()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Storage (always available)
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory storage backend for testing and session-lifetime state.
///
/// State is lost when the process exits. Wrap it in an `Arc` to hand the
/// same backing map to a second store and simulate a reload.
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<Snapshot>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create memory storage pre-populated with entries.
    #[must_use]
    pub fn with_entries(entries: Snapshot) -> Self {
        Self {
            data: RwLock::new(entries),
            quota: None,
        }
    }

    /// Limit the total stored bytes; larger snapshots are rejected.
    #[must_use]
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn load_all(&self) -> StorageResult<Snapshot> {
        let guard = self
            .data
            .read()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save_all(&self, entries: &Snapshot) -> StorageResult<()> {
        check_quota(entries, self.quota)?;
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        *guard = entries.clone();
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| StorageError::Corruption("lock poisoned".into()))?;
        guard.clear();
        Ok(())
    }
}

impl fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.data.read().map(|g| g.len()).unwrap_or(0);
        f.debug_struct("MemoryStorage")
            .field("entries", &count)
            .field("quota", &self.quota)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Storage (requires file-storage feature)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "file-storage")]
mod file_storage {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::fs::{self, File};
    use std::io::{BufReader, BufWriter, Write};
    use std::path::{Path, PathBuf};

    /// File format for stored entries (JSON).
    #[derive(Serialize, Deserialize)]
    struct StoreFile {
        /// Format version for future migrations.
        format_version: u32,
        /// Map of key -> raw stored string.
        entries: BTreeMap<String, String>,
    }

    impl StoreFile {
        const FORMAT_VERSION: u32 = 1;
    }

    /// File-based storage backend using JSON.
    ///
    /// # File Format
    ///
    /// ```json
    /// {
    ///   "format_version": 1,
    ///   "entries": {
    ///     "theme": "dark",
    ///     "lastSeenArticleId": "5"
    ///   }
    /// }
    /// ```
    ///
    /// Entries are kept sorted so the file diffs cleanly between saves.
    ///
    /// # Atomic Writes
    ///
    /// 1. Write to `{path}.tmp`
    /// 2. Flush and sync
    /// 3. Rename `{path}.tmp` -> `{path}`
    pub struct FileStorage {
        path: PathBuf,
        quota: Option<usize>,
    }

    impl FileStorage {
        /// Create a file storage at the given path.
        ///
        /// The file does not need to exist; it will be created on first save.
        #[must_use]
        pub fn new(path: impl AsRef<Path>) -> Self {
            Self {
                path: path.as_ref().to_path_buf(),
                quota: None,
            }
        }

        /// Limit the total stored bytes; larger snapshots are rejected.
        #[must_use]
        pub fn with_quota(mut self, bytes: usize) -> Self {
            self.quota = Some(bytes);
            self
        }

        /// Path of the backing file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }

        fn temp_path(&self) -> PathBuf {
            let mut tmp = self.path.clone();
            tmp.set_extension("json.tmp");
            tmp
        }
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "FileStorage"
        }

        fn load_all(&self) -> StorageResult<Snapshot> {
            if !self.path.exists() {
                return Ok(HashMap::new());
            }

            let file = File::open(&self.path)?;
            let reader = BufReader::new(file);

            let store_file: StoreFile = serde_json::from_reader(reader).map_err(|e| {
                StorageError::Serialization(format!("failed to parse store file: {e}"))
            })?;

            if store_file.format_version != StoreFile::FORMAT_VERSION {
                tracing::warn!(
                    stored = store_file.format_version,
                    expected = StoreFile::FORMAT_VERSION,
                    path = %self.path.display(),
                    "store file format version mismatch, ignoring stored entries"
                );
                return Ok(HashMap::new());
            }

            Ok(store_file.entries.into_iter().collect())
        }

        fn save_all(&self, entries: &Snapshot) -> StorageResult<()> {
            check_quota(entries, self.quota)?;

            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }

            let store_file = StoreFile {
                format_version: StoreFile::FORMAT_VERSION,
                entries: entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            };

            let tmp_path = self.temp_path();
            {
                let file = File::create(&tmp_path)?;
                let mut writer = BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, &store_file).map_err(|e| {
                    StorageError::Serialization(format!("failed to serialize store: {e}"))
                })?;
                writer.flush()?;
                writer.get_ref().sync_all()?;
            }

            fs::rename(&tmp_path, &self.path)?;

            tracing::debug!(
                path = %self.path.display(),
                entries = entries.len(),
                "saved store file"
            );

            Ok(())
        }

        fn clear(&self) -> StorageResult<()> {
            if self.path.exists() {
                fs::remove_file(&self.path)?;
            }
            Ok(())
        }

        fn is_available(&self) -> bool {
            if let Some(parent) = self.path.parent() {
                if !parent.exists() {
                    return fs::create_dir_all(parent).is_ok();
                }
                let test_path = parent.join(".portal_test_write");
                if fs::write(&test_path, b"test").is_ok() {
                    let _ = fs::remove_file(&test_path);
                    return true;
                }
            }
            false
        }
    }

    impl fmt::Debug for FileStorage {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("FileStorage")
                .field("path", &self.path)
                .field("quota", &self.quota)
                .finish()
        }
    }
}

#[cfg(feature = "file-storage")]
pub use file_storage::FileStorage;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
