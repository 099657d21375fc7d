//! Hand-maintained source files.
//!
//! `sources/*.json` hold schedules already in dataset shape (typically
//! transcribed from PDFs or images). Only the current month is emitted, so
//! these files flow through the same formatter and merge as scraped data.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};
use turnos_core::{RawRecord, current_month};

use crate::Scraper;

type SourceFile = BTreeMap<String, BTreeMap<String, SourceLocality>>;

#[derive(Deserialize)]
struct SourceLocality {
    #[serde(default = "unspecified_source")]
    fuente: String,
    #[serde(default = "lowest_confidence")]
    confianza: u8,
    #[serde(default)]
    dias: BTreeMap<String, Vec<SourceRecord>>,
}

#[derive(Deserialize)]
struct SourceRecord {
    #[serde(default)]
    nombre: String,
    #[serde(default)]
    direccion: String,
    #[serde(default)]
    telefono: Option<String>,
    #[serde(default)]
    mapa: Option<String>,
}

fn unspecified_source() -> String {
    "Fuente no especificada".to_string()
}

fn lowest_confidence() -> u8 {
    1
}

pub struct LocalSourcesScraper {
    dir: PathBuf,
    month: Option<String>,
}

impl LocalSourcesScraper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            month: None,
        }
    }

    /// Read this month instead of the current one.
    pub fn with_month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    fn json_files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .with_context(|| format!("listing {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn read_source(path: &Path) -> Result<SourceFile> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn records_for_month(mut file: SourceFile, month: &str) -> Vec<RawRecord> {
    let Some(localities) = file.remove(month) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (locality, info) in localities {
        for (day, records) in info.dias {
            for rec in records {
                if rec.direccion.trim().is_empty() {
                    debug!(%locality, %day, name = %rec.nombre, "skipping source record without address");
                    continue;
                }
                out.push(RawRecord {
                    name: rec.nombre,
                    address: rec.direccion,
                    phone: rec.telefono.unwrap_or_default(),
                    locality: locality.clone(),
                    source_url: info.fuente.clone(),
                    confidence: info.confianza,
                    day_of_month: day.clone(),
                    map_url: rec.mapa,
                });
            }
        }
    }
    out
}

#[async_trait]
impl Scraper for LocalSourcesScraper {
    fn name(&self) -> &str {
        "local-sources"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "sources directory missing, no local records");
            return Ok(Vec::new());
        }
        let month = match &self.month {
            Some(month) => month.as_str(),
            None => current_month(),
        };

        let mut records = Vec::new();
        for path in self.json_files()? {
            match read_source(&path) {
                Ok(file) => {
                    let found = records_for_month(file, month);
                    debug!(file = %path.display(), count = found.len(), "read source file");
                    records.extend(found);
                }
                Err(e) => warn!(file = %path.display(), error = %format!("{e:#}"), "skipping unreadable source file"),
            }
        }

        info!(month, count = records.len(), "local sources read");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOBOS: &str = r#"{
      "junio": {
        "Lobos": {
          "fuente": "PDF municipal",
          "confianza": 2,
          "dias": {
            "1": [{"nombre": "Farmacia Sol", "direccion": "Salgado 120", "telefono": "02227-421000", "mapa": null}],
            "2": [{"nombre": "Farmacia Luna", "direccion": "Hipolito Yrigoyen 40"}, {"nombre": "Sin direccion"}]
          }
        }
      },
      "julio": {
        "Lobos": {"dias": {"1": [{"nombre": "Otra", "direccion": "Calle 1"}]}}
      }
    }"#;

    #[tokio::test]
    async fn emits_only_the_requested_month() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lobos.json"), LOBOS).unwrap();

        let records = LocalSourcesScraper::new(tmp.path()).with_month("junio").fetch().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Farmacia Sol");
        assert_eq!(records[0].phone, "02227-421000");
        assert_eq!(records[0].source_url, "PDF municipal");
        assert_eq!(records[0].confidence, 2);
        assert_eq!(records[1].day_of_month, "2");
        assert_eq!(records[1].phone, "");
    }

    #[tokio::test]
    async fn defaults_source_and_confidence() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("lobos.json"), LOBOS).unwrap();

        let records = LocalSourcesScraper::new(tmp.path()).with_month("julio").fetch().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_url, "Fuente no especificada");
        assert_eq!(records[0].confidence, 1);
    }

    #[tokio::test]
    async fn bad_files_are_skipped() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a_broken.json"), "{ not json").unwrap();
        std::fs::write(tmp.path().join("b_lobos.json"), LOBOS).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let records = LocalSourcesScraper::new(tmp.path()).with_month("junio").fetch().await.unwrap();

        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn defaults_to_the_current_month() {
        let tmp = TempDir::new().unwrap();
        let file = format!(
            r#"{{"{}": {{"Lobos": {{"dias": {{"4": [{{"nombre": "Farmacia Sol", "direccion": "Salgado 120"}}]}}}}}}}}"#,
            current_month()
        );
        std::fs::write(tmp.path().join("lobos.json"), file).unwrap();

        let records = LocalSourcesScraper::new(tmp.path()).fetch().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].day_of_month, "4");
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let records = LocalSourcesScraper::new(tmp.path().join("nope")).fetch().await.unwrap();
        assert!(records.is_empty());
    }
}
