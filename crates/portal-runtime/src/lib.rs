#![forbid(unsafe_code)]

//! Runtime services for the portal shell: pluggable storage backends, the
//! key/value [`Store`](store::Store) used for both the durable and the
//! session tier, and the [`Clock`](clock::Clock) that stamps timestamps.

pub mod clock;
pub mod state_persistence;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use state_persistence::{MemoryStorage, StorageBackend, StorageError, StorageResult};
#[cfg(feature = "file-storage")]
pub use state_persistence::FileStorage;
pub use store::{Store, StoreStats, StoreTier};
