//! Load, merge, and persist the canonical dataset file.

use std::path::{Path, PathBuf};

use tracing::{error, info};
use turnos_core::{CanonicalDataset, MergeStats, merge_with_stats};

use crate::json::{quarantine, read_json, write_json_atomic};
use crate::StoreError;

/// Persists one run's results into the dataset file at `path`.
///
/// Not safe for concurrent writers: two overlapping runs race and the last
/// write wins.
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted dataset. A missing file is an empty dataset; a
    /// corrupt one is moved aside (never silently overwritten) and also
    /// treated as empty.
    pub fn load(&self) -> Result<CanonicalDataset, StoreError> {
        match read_json(&self.path) {
            Ok(Some(dataset)) => Ok(dataset),
            Ok(None) => Ok(CanonicalDataset::new()),
            Err(e) if e.is_corrupt() => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "dataset file is corrupt; previous history is set aside and the run starts from empty"
                );
                quarantine(&self.path)?;
                Ok(CanonicalDataset::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Merge `incoming` into the persisted dataset and write the result back.
    pub fn write(&self, incoming: CanonicalDataset) -> Result<MergeStats, StoreError> {
        let existing = self.load()?;
        let (merged, stats) = merge_with_stats(existing, incoming);
        write_json_atomic(&self.path, &merged)?;
        info!(
            path = %self.path.display(),
            records = merged.record_count(),
            months_added = stats.months_added,
            localities_added = stats.localities_added,
            days_added = stats.days_added,
            replaced = stats.replaced,
            appended = stats.appended,
            "dataset snapshot written"
        );
        Ok(stats)
    }
}
