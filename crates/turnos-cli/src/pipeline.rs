//! One full run: scrape, format, merge, persist, publish.

use std::path::PathBuf;

use anyhow::Context;
use tracing::{info, warn};
use turnos_core::{CanonicalDataset, merge};
use turnos_geo::{CoordinateResolver, format_records};
use turnos_sources::{
    LocalSourcesScraper, ScraperRegistry, ScriptTableScraper, ShiftTableScraper, SimcalScraper,
};
use turnos_store::{LocalitiesIndex, SnapshotWriter};
use turnos_sync::{GitPublisher, HttpFetcher};

use crate::summary::RunSummary;

pub const COMMIT_MESSAGE: &str = "Actualización automática de farmacias de turno";

/// Every scraper the run knows about, local files first.
pub fn standard_scrapers(sources_dir: PathBuf, fetcher: HttpFetcher) -> ScraperRegistry {
    let mut registry = ScraperRegistry::new();
    registry
        .register(LocalSourcesScraper::new(sources_dir))
        .register(SimcalScraper::san_isidro(fetcher.clone()))
        .register(ShiftTableScraper::mar_del_plata(fetcher.clone()))
        .register(ScriptTableScraper::zarate(fetcher));
    registry
}

pub struct Pipeline {
    pub registry: ScraperRegistry,
    pub resolver: CoordinateResolver,
    pub snapshot: SnapshotWriter,
    pub localities_path: PathBuf,
    pub province: String,
    pub month: String,
    pub publisher: Option<GitPublisher>,
}

impl Pipeline {
    /// Run every stage, filling `summary` as it goes so a failed run still
    /// reports how far it got.
    pub async fn run(&mut self, summary: &mut RunSummary) -> anyhow::Result<()> {
        let outcomes = self.registry.run_all().await;

        let mut combined = CanonicalDataset::new();
        for outcome in outcomes {
            match outcome.records {
                Ok(records) => {
                    summary.scrapers_ok += 1;
                    summary.records += records.len();
                    let batch = format_records(&mut self.resolver, &records, &self.month).await;
                    combined = merge(combined, batch);
                }
                Err(_) => summary.scrapers_failed.push(outcome.scraper),
            }
        }
        summary.resolver = Some(self.resolver.stats());
        info!(
            month = %self.month,
            records = summary.records,
            scrapers_failed = summary.scrapers_failed.len(),
            "scraping finished"
        );

        let stats = self
            .snapshot
            .write(combined)
            .with_context(|| format!("writing {}", self.snapshot.path().display()))?;
        summary.merge = Some(stats);

        let dataset = self.snapshot.load().context("re-reading dataset for the localities index")?;
        let added = LocalitiesIndex::update(&self.localities_path, &self.province, &dataset)
            .with_context(|| format!("updating {}", self.localities_path.display()))?;
        summary.localities_added = Some(added);

        match &self.publisher {
            Some(publisher) => {
                let outcome = publisher
                    .commit_and_push(COMMIT_MESSAGE)
                    .await
                    .context("publishing dataset repository")?;
                summary.publish = Some(outcome);
            }
            None => warn!("publishing disabled, dataset left uncommitted"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Local;
    use std::time::Duration;
    use tempfile::TempDir;
    use turnos_core::{Coordinates, RawRecord};
    use turnos_geo::{NavigateError, Navigator};
    use turnos_sources::Scraper;
    use turnos_store::CoordinateCache;

    struct NoBrowser;

    #[async_trait]
    impl Navigator for NoBrowser {
        async fn navigate(&self, _url: &str, _settle: Duration) -> Result<String, NavigateError> {
            Err(NavigateError::Other("no browser in tests".into()))
        }

        fn name(&self) -> &str {
            "none"
        }
    }

    struct Canned;

    #[async_trait]
    impl Scraper for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn fetch(&self) -> anyhow::Result<Vec<RawRecord>> {
            Ok(vec![RawRecord {
                name: "Farmacia Centro".into(),
                address: "Av. Libertador 100".into(),
                phone: "4700-0000".into(),
                locality: "San Isidro".into(),
                source_url: "http://x".into(),
                confidence: 3,
                day_of_month: "5".into(),
                map_url: Some("https://www.google.com/maps/place/C/@-34.47,-58.52,17z".into()),
            }])
        }
    }

    struct Down;

    #[async_trait]
    impl Scraper for Down {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch(&self) -> anyhow::Result<Vec<RawRecord>> {
            anyhow::bail!("503 from upstream")
        }
    }

    fn pipeline(dir: &TempDir) -> Pipeline {
        let mut registry = ScraperRegistry::new();
        registry.register(Canned).register(Down);
        Pipeline {
            registry,
            resolver: CoordinateResolver::new(CoordinateCache::in_memory(), NoBrowser),
            snapshot: SnapshotWriter::new(dir.path().join("data/farmacias_turno.json")),
            localities_path: dir.path().join("data/localidades.json"),
            province: "Buenos Aires".into(),
            month: "junio".into(),
            publisher: None,
        }
    }

    #[tokio::test]
    async fn run_persists_dataset_and_localities() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);
        let mut summary = RunSummary::new(Local::now(), None);

        p.run(&mut summary).await.unwrap();

        assert_eq!(summary.scrapers_ok, 1);
        assert_eq!(summary.scrapers_failed, ["down"]);
        assert_eq!(summary.records, 1);
        assert_eq!(summary.localities_added, Some(1));
        assert_eq!(summary.resolver.unwrap().from_map_url, 1);

        let dataset = p.snapshot.load().unwrap();
        let bucket = dataset.bucket("junio", "San Isidro", "5").unwrap();
        assert_eq!(bucket[0].phone, "47000000");
        assert_eq!(bucket[0].coordinates, Coordinates::new(-34.47, -58.52));

        let index = LocalitiesIndex::load(&p.localities_path).unwrap();
        assert_eq!(index.get("Buenos Aires")[0].name, "San Isidro");
    }

    #[tokio::test]
    async fn rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut p = pipeline(&dir);

        p.run(&mut RunSummary::new(Local::now(), None)).await.unwrap();
        let first = std::fs::read_to_string(p.snapshot.path()).unwrap();
        let mut second_summary = RunSummary::new(Local::now(), None);
        p.run(&mut second_summary).await.unwrap();
        let second = std::fs::read_to_string(p.snapshot.path()).unwrap();

        assert_eq!(first, second);
        let stats = second_summary.merge.unwrap();
        assert_eq!((stats.replaced, stats.appended), (0, 0));
        assert_eq!(second_summary.localities_added, Some(0));
        // Second lookup of the same address comes from the cache.
        assert_eq!(p.resolver.stats().cache_hits, 1);
    }
}
