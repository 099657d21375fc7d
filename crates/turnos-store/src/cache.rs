//! Persisted address -> coordinates cache.
//!
//! The whole mapping is loaded once and written back in full after every new
//! entry (write-through), so an interrupted run loses at most the lookup in
//! flight. Keys are exact address strings; no canonicalization is applied.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{error, info};
use turnos_core::Coordinates;

use crate::json::{quarantine, read_json, write_json_atomic};
use crate::StoreError;

pub type CacheEntries = BTreeMap<String, Coordinates>;

/// Where cache entries are persisted.
pub trait CacheBackend: Send {
    /// Read the persisted mapping. Missing storage is an empty mapping.
    fn load(&self) -> Result<CacheEntries, StoreError>;

    /// Replace the persisted mapping with `entries`.
    fn save(&self, entries: &CacheEntries) -> Result<(), StoreError>;
}

/// A JSON file holding `{"<address>": {"lat": .., "lng": ..}}`.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheBackend for JsonFileBackend {
    fn load(&self) -> Result<CacheEntries, StoreError> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn save(&self, entries: &CacheEntries) -> Result<(), StoreError> {
        write_json_atomic(&self.path, entries)
    }
}

/// In-process backend. Clones share state, so a test can keep a handle and
/// inspect what the cache persisted.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<(CacheEntries, usize)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: CacheEntries) -> Self {
        Self {
            state: Arc::new(Mutex::new((entries, 0))),
        }
    }

    /// The last saved mapping.
    pub fn saved(&self) -> CacheEntries {
        self.lock().0.clone()
    }

    /// How many times `save` was called.
    pub fn save_count(&self) -> usize {
        self.lock().1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (CacheEntries, usize)> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheBackend for MemoryBackend {
    fn load(&self) -> Result<CacheEntries, StoreError> {
        Ok(self.lock().0.clone())
    }

    fn save(&self, entries: &CacheEntries) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.0 = entries.clone();
        state.1 += 1;
        Ok(())
    }
}

/// The coordinate cache, backed by a [`CacheBackend`].
pub struct CoordinateCache {
    entries: CacheEntries,
    backend: Box<dyn CacheBackend>,
}

impl CoordinateCache {
    /// Load the cache from `backend`. A corrupt store is an error; the caller
    /// decides whether to abort or start over.
    pub fn open(backend: impl CacheBackend + 'static) -> Result<Self, StoreError> {
        let entries = backend.load()?;
        info!(entries = entries.len(), "loaded coordinate cache");
        Ok(Self {
            entries,
            backend: Box::new(backend),
        })
    }

    /// Open the JSON cache at `path`; a corrupt file is moved aside and the
    /// cache starts empty. Losing the cache only costs re-resolution.
    pub fn open_or_quarantine(path: &Path) -> Result<Self, StoreError> {
        match Self::open(JsonFileBackend::new(path)) {
            Err(e) if e.is_corrupt() => {
                error!(path = %path.display(), error = %e, "coordinate cache is corrupt, starting empty");
                quarantine(path)?;
                Self::open(JsonFileBackend::new(path))
            }
            other => other,
        }
    }

    /// A cache that persists nowhere but memory.
    pub fn in_memory() -> Self {
        Self {
            entries: CacheEntries::new(),
            backend: Box::new(MemoryBackend::new()),
        }
    }

    pub fn get(&self, address: &str) -> Option<Coordinates> {
        self.entries.get(address).copied()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains_key(address)
    }

    /// Insert or update an entry and persist the full mapping.
    ///
    /// Never replaces resolved coordinates with unresolved ones; returns
    /// `Ok(false)` when nothing changed.
    pub fn put(&mut self, address: &str, coords: Coordinates) -> Result<bool, StoreError> {
        match self.entries.get(address) {
            Some(current) if *current == coords => return Ok(false),
            Some(current) if current.is_resolved() && !coords.is_resolved() => return Ok(false),
            _ => {}
        }
        self.entries.insert(address.to_string(), coords);
        self.backend.save(&self.entries)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Addresses whose last lookup failed.
    pub fn unresolved(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, c)| !c.is_resolved())
            .map(|(k, _)| k.as_str())
            .collect()
    }
}
