//! Scrapers: one per upstream site, all producing [`RawRecord`]s.
//!
//! The pipeline only sees the [`Scraper`] capability and never branches on
//! which site a record came from.

use async_trait::async_trait;
use tracing::{error, info};
use turnos_core::RawRecord;

pub mod html;
pub mod local;
pub mod script;
pub mod script_table;
pub mod shift_table;
pub mod simcal;

pub use local::LocalSourcesScraper;
pub use script_table::ScriptTableScraper;
pub use shift_table::ShiftTableScraper;
pub use simcal::SimcalScraper;

#[async_trait]
pub trait Scraper: Send + Sync {
    fn name(&self) -> &str;

    /// Every on-duty record the source currently publishes.
    ///
    /// A source with nothing to report returns an empty list; `Err` is
    /// reserved for hard failures (unreachable site, unparseable page).
    async fn fetch(&self) -> anyhow::Result<Vec<RawRecord>>;
}

/// Result of running one scraper.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub scraper: String,
    pub records: Result<Vec<RawRecord>, String>,
}

impl ScrapeOutcome {
    pub fn is_ok(&self) -> bool {
        self.records.is_ok()
    }

    pub fn record_count(&self) -> usize {
        self.records.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Default)]
pub struct ScraperRegistry {
    scrapers: Vec<Box<dyn Scraper>>,
}

impl ScraperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scraper: impl Scraper + 'static) -> &mut Self {
        self.scrapers.push(Box::new(scraper));
        self
    }

    pub fn len(&self) -> usize {
        self.scrapers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrapers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.scrapers.iter().map(|s| s.name()).collect()
    }

    /// Run every scraper in registration order, one at a time.
    ///
    /// A failing scraper is logged and reported in its outcome; the rest
    /// still run.
    pub async fn run_all(&self) -> Vec<ScrapeOutcome> {
        let mut outcomes = Vec::with_capacity(self.scrapers.len());
        for scraper in &self.scrapers {
            let name = scraper.name().to_string();
            info!(scraper = %name, "running scraper");
            let records = match scraper.fetch().await {
                Ok(records) => {
                    info!(scraper = %name, count = records.len(), "scraper finished");
                    Ok(records)
                }
                Err(e) => {
                    let detail = format!("{e:#}");
                    error!(scraper = %name, error = %detail, "scraper failed");
                    Err(detail)
                }
            };
            outcomes.push(ScrapeOutcome { scraper: name, records });
        }
        outcomes
    }
}
