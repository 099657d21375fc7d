//! Sites built on the Simple Calendar WordPress plugin: a month grid where
//! each day cell lists that day's on-duty pharmacies as events.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use tracing::info;
use turnos_core::RawRecord;
use turnos_core::normalize::strip_region_prefix;
use turnos_sync::HttpFetcher;

use crate::Scraper;
use crate::html::{first_text, lines_of, selector};

static DAY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}").expect("day number"));

pub struct SimcalScraper {
    url: String,
    locality: String,
    confidence: u8,
    fetcher: HttpFetcher,
}

impl SimcalScraper {
    pub fn new(url: impl Into<String>, locality: impl Into<String>, confidence: u8, fetcher: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            locality: locality.into(),
            confidence,
            fetcher,
        }
    }

    pub fn san_isidro(fetcher: HttpFetcher) -> Self {
        Self::new(
            "https://colfarma.info/colfarmasanisidro/farmacias-de-turno/",
            "San Isidro",
            3,
            fetcher,
        )
    }

    pub fn parse(&self, page: &str) -> Result<Vec<RawRecord>> {
        let doc = Html::parse_document(page);
        let day_cell = selector("td.simcal-day-has-events")?;
        let day_label = selector("span.simcal-day-label, .simcal-day-number")?;
        let event = selector("li.simcal-event")?;
        let title = selector("span.simcal-event-title")?;
        let address = selector("span.simcal-event-address")?;
        let description = selector("div.simcal-event-description")?;

        let mut records = Vec::new();
        for cell in doc.select(&day_cell) {
            let Some(label) = first_text(cell, &day_label) else {
                continue;
            };
            let day = DAY_NUMBER
                .find(&label)
                .map_or(label.as_str(), |m| m.as_str())
                .to_string();

            for ev in cell.select(&event) {
                let Some(name) = first_text(ev, &title) else {
                    continue;
                };
                let street = strip_region_prefix(&first_text(ev, &address).unwrap_or_default());
                let phone = ev
                    .select(&description)
                    .next()
                    .and_then(|d| lines_of(d).into_iter().find(|l| l.contains('✆') || l.contains("Tel")))
                    .map(|l| l.replace('✆', "").trim().to_string())
                    .unwrap_or_default();
                let map_url = format!(
                    "https://www.google.com/maps/search/{}+{}",
                    urlencoding::encode(&street),
                    urlencoding::encode(&self.locality)
                );

                records.push(RawRecord {
                    name,
                    address: street,
                    phone,
                    locality: self.locality.clone(),
                    source_url: self.url.clone(),
                    confidence: self.confidence,
                    day_of_month: day.clone(),
                    map_url: Some(map_url),
                });
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl Scraper for SimcalScraper {
    fn name(&self) -> &str {
        &self.locality
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let page = self
            .fetcher
            .get_text(&self.url)
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        let records = self.parse(&page)?;
        info!(locality = %self.locality, count = records.len(), "calendar parsed");
        Ok(records)
    }
}
