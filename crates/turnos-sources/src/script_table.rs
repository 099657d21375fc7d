//! Sites that ship the schedule as JavaScript data: a `turnos` array of
//! `{ dia, farmacias: { <zone>: name | [names] } }` and a `farmacias` object
//! mapping each zone to pharmacy details.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};
use turnos_core::RawRecord;
use turnos_sync::HttpFetcher;

use crate::Scraper;
use crate::script::extract_js_value;

static DAY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{1,2}").expect("day number"));

#[derive(Deserialize)]
struct Shift {
    dia: String,
    #[serde(default)]
    farmacias: BTreeMap<String, OneOrMany>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn names(&self) -> &[String] {
        match self {
            OneOrMany::One(name) => std::slice::from_ref(name),
            OneOrMany::Many(names) => names,
        }
    }
}

#[derive(Deserialize)]
struct Pharmacy {
    #[serde(default)]
    farmacia: String,
    #[serde(default, alias = "dirección")]
    direccion: String,
    #[serde(default, alias = "teléfono")]
    telefono: String,
}

/// Accent- and case-insensitive form used to match shift names to details.
fn fold(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'Á' | 'À' => 'a',
            'é' | 'è' | 'É' | 'È' => 'e',
            'í' | 'Í' => 'i',
            'ó' | 'ò' | 'Ó' | 'Ò' => 'o',
            'ú' | 'ü' | 'Ú' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

pub struct ScriptTableScraper {
    url: String,
    locality: String,
    confidence: u8,
    fetcher: HttpFetcher,
}

impl ScriptTableScraper {
    pub fn new(url: impl Into<String>, locality: impl Into<String>, confidence: u8, fetcher: HttpFetcher) -> Self {
        Self {
            url: url.into(),
            locality: locality.into(),
            confidence,
            fetcher,
        }
    }

    pub fn zarate(fetcher: HttpFetcher) -> Self {
        Self::new(
            "https://www.colfarmazarate.com/administracion-de-turnos/index.js",
            "Zarate",
            3,
            fetcher,
        )
    }

    pub fn parse(&self, js: &str) -> Result<Vec<RawRecord>> {
        let shifts: Vec<Shift> =
            serde_json::from_value(extract_js_value(js, "turnos")?).context("unexpected `turnos` shape")?;
        let details: BTreeMap<String, Vec<Pharmacy>> =
            serde_json::from_value(extract_js_value(js, "farmacias")?).context("unexpected `farmacias` shape")?;

        let mut records = Vec::new();
        for shift in &shifts {
            let Some(day) = DAY_NUMBER.find(&shift.dia) else {
                debug!(dia = %shift.dia, "shift without a day number");
                continue;
            };
            for (zone, names) in &shift.farmacias {
                let zone_details = details.get(zone).map(Vec::as_slice).unwrap_or_default();
                for name in names.names() {
                    let wanted = fold(name);
                    let Some(found) = zone_details.iter().find(|p| fold(&p.farmacia) == wanted) else {
                        debug!(%zone, %name, "no details for pharmacy on duty");
                        continue;
                    };
                    let (name, street) = (found.farmacia.trim(), found.direccion.trim());
                    if name.is_empty() || street.is_empty() {
                        continue;
                    }
                    let address = format!("{street}, {}", self.locality);
                    let map_url = format!("https://www.google.com/maps/search/{}", urlencoding::encode(&address));

                    records.push(RawRecord {
                        name: name.to_string(),
                        address,
                        phone: found.telefono.trim().to_string(),
                        locality: self.locality.clone(),
                        source_url: self.url.clone(),
                        confidence: self.confidence,
                        day_of_month: day.as_str().to_string(),
                        map_url: Some(map_url),
                    });
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl Scraper for ScriptTableScraper {
    fn name(&self) -> &str {
        &self.locality
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let js = self
            .fetcher
            .get_text(&self.url)
            .await
            .with_context(|| format!("fetching {}", self.url))?;
        let records = self.parse(&js)?;
        info!(locality = %self.locality, count = records.len(), "script schedule parsed");
        Ok(records)
    }
}
