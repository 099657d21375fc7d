//! Storage layer: JSON files for the coordinate cache, dataset snapshots, and localities index.

mod error;
pub use error::StoreError;

pub mod cache;
pub mod json;
pub mod localities;
pub mod snapshot;

pub use cache::{CacheBackend, CoordinateCache, JsonFileBackend, MemoryBackend};
pub use json::{quarantine, read_json, write_json_atomic};
pub use localities::{LocalitiesIndex, LocalityPoint};
pub use snapshot::SnapshotWriter;
