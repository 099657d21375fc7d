//! Index of every known locality, grouped by province.
//!
//! Append-only: localities are added the first time they show up in the
//! dataset and are never removed. Coordinates are filled in separately (by
//! hand or by a later lookup), so existing entries are never overwritten.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use turnos_core::{CanonicalDataset, Coordinates};

use crate::json::{quarantine, read_json, write_json_atomic};
use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityPoint {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "coordenadas", default)]
    pub coordinates: Coordinates,
}

/// `{"<province>": [{"nombre", "coordenadas"}]}`, each list sorted by name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalitiesIndex {
    pub provinces: BTreeMap<String, Vec<LocalityPoint>>,
}

impl LocalitiesIndex {
    /// Load the index; missing is empty, corrupt is moved aside and empty.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        match read_json(path) {
            Ok(index) => Ok(index.unwrap_or_default()),
            Err(e) if e.is_corrupt() => {
                error!(path = %path.display(), error = %e, "localities index is corrupt, rebuilding");
                quarantine(path)?;
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        write_json_atomic(path, self)
    }

    /// Add every dataset locality missing from `province`. Returns how many
    /// were added.
    pub fn add_from(&mut self, province: &str, dataset: &CanonicalDataset) -> usize {
        let list = self.provinces.entry(province.to_string()).or_default();
        let mut added = 0;
        for name in dataset.localities() {
            if list.iter().any(|p| p.name == name) {
                continue;
            }
            list.push(LocalityPoint {
                name: name.to_string(),
                coordinates: Coordinates::unresolved(),
            });
            added += 1;
        }
        list.sort_by(|a, b| a.name.cmp(&b.name));
        added
    }

    /// Load, extend from `dataset`, and write back the index at `path`.
    pub fn update(path: &Path, province: &str, dataset: &CanonicalDataset) -> Result<usize, StoreError> {
        let mut index = Self::load(path)?;
        let added = index.add_from(province, dataset);
        index.save(path)?;
        info!(path = %path.display(), province, added, "localities index updated");
        Ok(added)
    }

    pub fn get(&self, province: &str) -> &[LocalityPoint] {
        self.provinces.get(province).map(Vec::as_slice).unwrap_or_default()
    }
}
