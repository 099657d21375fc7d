//! Address -> coordinates resolution, cache first.
//!
//! Order of attempts, stopping at the first success:
//!
//! 1. cache hit (a cached failure counts as a hit unless retries are enabled)
//! 2. coordinates embedded in the source's map link
//! 3. browser lookup of a map search for the address
//!
//! Every outcome of steps 2 and 3, including failure, is written to the cache
//! before returning. Resolution never fails: errors degrade to unresolved
//! coordinates.

use std::time::Duration;

use tracing::{debug, info, warn};
use turnos_core::Coordinates;
use turnos_store::CoordinateCache;

use crate::extract::{extract_coordinates, search_url};
use crate::navigator::Navigator;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Counters for one resolver's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub cache_hits: usize,
    pub from_map_url: usize,
    pub browser_lookups: usize,
    pub browser_resolved: usize,
    pub failures: usize,
}

pub struct CoordinateResolver {
    cache: CoordinateCache,
    navigator: Box<dyn Navigator>,
    settle: Duration,
    retry_unresolved: bool,
    stats: ResolverStats,
}

impl CoordinateResolver {
    pub fn new(cache: CoordinateCache, navigator: impl Navigator + 'static) -> Self {
        Self {
            cache,
            navigator: Box::new(navigator),
            settle: DEFAULT_SETTLE_DELAY,
            retry_unresolved: false,
            stats: ResolverStats::default(),
        }
    }

    /// How long the browser waits for the map page to redirect.
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Treat cached failures as misses and look them up again.
    pub fn with_retry_unresolved(mut self, retry: bool) -> Self {
        self.retry_unresolved = retry;
        self
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    pub async fn resolve(&mut self, address: &str, map_url: Option<&str>) -> Coordinates {
        if let Some(cached) = self.cache.get(address) {
            if cached.is_resolved() || !self.retry_unresolved {
                self.stats.cache_hits += 1;
                debug!(address, resolved = cached.is_resolved(), "coordinate cache hit");
                return cached;
            }
        }

        if let Some(coords) = map_url.filter(|u| !u.trim().is_empty()).and_then(extract_coordinates) {
            self.stats.from_map_url += 1;
            debug!(address, ?coords, "coordinates taken from map link");
            self.remember(address, coords);
            return coords;
        }

        let coords = match self.lookup(address).await {
            Some(coords) => {
                self.stats.browser_resolved += 1;
                info!(address, lat = coords.lat, lng = coords.lng, "resolved address");
                coords
            }
            None => {
                self.stats.failures += 1;
                warn!(address, "could not resolve address");
                Coordinates::unresolved()
            }
        };
        self.remember(address, coords);
        coords
    }

    async fn lookup(&mut self, address: &str) -> Option<Coordinates> {
        self.stats.browser_lookups += 1;
        let url = search_url(address);
        info!(address, navigator = self.navigator.name(), "looking up address in browser");
        match self.navigator.navigate(&url, self.settle).await {
            Ok(final_url) => extract_coordinates(&final_url),
            Err(e) => {
                warn!(address, error = %e, "browser lookup failed");
                None
            }
        }
    }

    fn remember(&mut self, address: &str, coords: Coordinates) {
        if let Err(e) = self.cache.put(address, coords) {
            warn!(address, error = %e, "failed to persist coordinate cache");
        }
    }
}
