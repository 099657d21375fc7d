//! Sites that publish only today's shift as a table of `tr.trturnos` rows
//! (letter, name, address, phone).
//!
//! The pharmacy shift changes in the morning, not at midnight: before the
//! cut-over time the listed pharmacies belong to the previous day's shift.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime};
use scraper::Html;
use tracing::info;
use turnos_core::RawRecord;
use turnos_sync::HttpFetcher;

use crate::Scraper;
use crate::html::{selector, text_of};

const PROVINCE_SUFFIX: &str = "Provincia de Buenos Aires";

pub struct ShiftTableScraper {
    url: String,
    locality: String,
    confidence: u8,
    cutover: NaiveTime,
    /// Address fragments that already name a place other than `locality`.
    own_localities: Vec<String>,
    fetcher: HttpFetcher,
}

impl ShiftTableScraper {
    pub fn new(url: impl Into<String>, locality: impl Into<String>, confidence: u8, fetcher: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            locality: locality.into(),
            confidence,
            cutover: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or_default(),
            own_localities: Vec::new(),
            fetcher,
        }
    }

    pub fn mar_del_plata(fetcher: HttpFetcher) -> Self {
        let mut scraper = Self::new("http://www.colfarmamdp.com.ar/", "Mar del Plata", 3, fetcher);
        scraper.own_localities.push("BATAN".to_string());
        scraper
    }

    pub fn with_cutover(mut self, cutover: NaiveTime) -> Self {
        self.cutover = cutover;
        self
    }

    /// Day of month whose shift is running at `now`.
    pub fn duty_day(&self, now: NaiveDateTime) -> u32 {
        if now.time() < self.cutover {
            (now - Duration::days(1)).day()
        } else {
            now.day()
        }
    }

    pub fn parse(&self, page: &str, day: u32) -> Result<Vec<RawRecord>> {
        let doc = Html::parse_document(page);
        let row = selector("tr.trturnos")?;
        let cell = selector("td")?;

        let mut records = Vec::new();
        for tr in doc.select(&row) {
            let cells: Vec<String> = tr.select(&cell).map(text_of).collect();
            if cells.len() < 4 {
                continue;
            }
            let street = &cells[2];
            let upper = street.to_uppercase();
            let address = if self.own_localities.iter().any(|l| upper.contains(l.as_str())) {
                format!("{street}, {PROVINCE_SUFFIX}")
            } else {
                format!("{street}, {}, {PROVINCE_SUFFIX}", self.locality)
            };
            let map_url = format!(
                "https://www.google.com/maps/search/?api=1&query={}",
                urlencoding::encode(&address)
            );

            records.push(RawRecord {
                name: cells[1].clone(),
                address,
                phone: cells[3].clone(),
                locality: self.locality.clone(),
                source_url: self.url.clone(),
                confidence: self.confidence,
                day_of_month: day.to_string(),
                map_url: Some(map_url),
            });
        }
        Ok(records)
    }
}

#[async_trait]
impl Scraper for ShiftTableScraper {
    fn name(&self) -> &str {
        &self.locality
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let page = self
            .fetcher
            .get_text(&self.url)
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        let day = self.duty_day(Local::now().naive_local());
        let records = self.parse(&page, day)?;
        info!(locality = %self.locality, day, count = records.len(), "shift table parsed");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scraper() -> ShiftTableScraper {
        ShiftTableScraper::mar_del_plata(HttpFetcher::new().unwrap())
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, day).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn shift_changes_at_half_past_eight() {
        let s = scraper();
        assert_eq!(s.duty_day(at(10, 8, 29)), 9);
        assert_eq!(s.duty_day(at(10, 8, 30)), 10);
        assert_eq!(s.duty_day(at(10, 23, 59)), 10);
        // Early on the 1st the shift is still last month's final day.
        assert_eq!(s.duty_day(at(1, 2, 0)), 30);
    }

    #[test]
    fn rows_become_records() {
        let page = r#"<table>
            <tr class="trturnos"><td>A</td><td>Farmacia Güemes</td><td>Güemes 2800</td><td>(0223) 451-0000</td></tr>
            <tr class="trturnos"><td>B</td><td>Farmacia Batán</td><td>Calle 131 N 200 BATAN</td><td>464-1234</td></tr>
            <tr class="trturnos"><td colspan="4">Sin datos</td></tr>
            <tr><td>C</td><td>Cabecera</td><td>Dirección</td><td>Teléfono</td></tr>
        </table>"#;

        let records = scraper().parse(page, 12).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Farmacia Güemes");
        assert_eq!(records[0].address, "Güemes 2800, Mar del Plata, Provincia de Buenos Aires");
        assert_eq!(records[0].phone, "(0223) 451-0000");
        assert_eq!(records[0].day_of_month, "12");
        assert_eq!(records[1].address, "Calle 131 N 200 BATAN, Provincia de Buenos Aires");
        assert!(records[1].map_url.as_deref().unwrap().starts_with("https://www.google.com/maps/search/?api=1&query="));
    }
}
