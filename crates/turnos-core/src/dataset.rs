//! The canonical, persisted dataset: `month -> locality -> day -> records`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use serde::{Deserialize, Deserializer, Serialize};

use crate::record::FormattedRecord;

/// Lowercase Spanish month names, indexed by `month0()`.
const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Month key for the given date ("junio", "diciembre", ...).
pub fn month_name(date: impl Datelike) -> &'static str {
    MONTHS[date.month0() as usize]
}

/// Month key for today in local time.
pub fn current_month() -> &'static str {
    month_name(chrono::Local::now().date_naive())
}

/// Day-of-month bucket key.
///
/// Numeric days are stored without zero padding and sort in calendar order;
/// anything else is kept verbatim and sorts after every numeric day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Day(String);

impl From<String> for Day {
    fn from(raw: String) -> Self {
        Day::parse(&raw)
    }
}

impl From<Day> for String {
    fn from(day: Day) -> Self {
        day.0
    }
}

impl Day {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<u32>() {
            Ok(n) if (1..=31).contains(&n) => Self(n.to_string()),
            _ => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn number(&self) -> Option<u32> {
        self.0.parse().ok()
    }
}

impl Ord for Day {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Day {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Day {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything known about one locality within one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalityEntry {
    #[serde(rename = "fuente")]
    pub source: String,
    #[serde(rename = "confianza")]
    pub confidence: u8,
    #[serde(rename = "dias", default, deserialize_with = "normalized_days")]
    pub days: BTreeMap<Day, Vec<FormattedRecord>>,
}

/// Day buckets as written on disk; keys that normalize to the same day
/// ("05" and "5") are concatenated in key order.
fn normalized_days<'de, D>(deserializer: D) -> Result<BTreeMap<Day, Vec<FormattedRecord>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<FormattedRecord>>::deserialize(deserializer)?;
    let mut days: BTreeMap<Day, Vec<FormattedRecord>> = BTreeMap::new();
    for (key, records) in raw {
        days.entry(Day::parse(&key)).or_default().extend(records);
    }
    Ok(days)
}

impl LocalityEntry {
    pub fn new(source: impl Into<String>, confidence: u8) -> Self {
        Self {
            source: source.into(),
            confidence,
            days: BTreeMap::new(),
        }
    }
}

/// The full nested store: month name -> locality name -> [`LocalityEntry`].
///
/// Ordered maps keep the serialized file stable between runs so diffs only
/// show real changes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalDataset {
    pub months: BTreeMap<String, BTreeMap<String, LocalityEntry>>,
}

impl CanonicalDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Get or create the locality entry for `month`. Source and confidence are
    /// only used when the entry is created.
    pub fn locality_mut(
        &mut self,
        month: &str,
        locality: &str,
        source: &str,
        confidence: u8,
    ) -> &mut LocalityEntry {
        self.months
            .entry(month.to_string())
            .or_default()
            .entry(locality.to_string())
            .or_insert_with(|| LocalityEntry::new(source, confidence))
    }

    pub fn locality(&self, month: &str, locality: &str) -> Option<&LocalityEntry> {
        self.months.get(month)?.get(locality)
    }

    /// Records in one `(month, locality, day)` bucket.
    pub fn bucket(&self, month: &str, locality: &str, day: &str) -> Option<&[FormattedRecord]> {
        self.locality(month, locality)?
            .days
            .get(&Day::parse(day))
            .map(Vec::as_slice)
    }

    /// Total number of records across all buckets.
    pub fn record_count(&self) -> usize {
        self.months
            .values()
            .flat_map(|localities| localities.values())
            .flat_map(|entry| entry.days.values())
            .map(Vec::len)
            .sum()
    }

    /// Every locality name appearing in any month.
    pub fn localities(&self) -> BTreeSet<&str> {
        self.months
            .values()
            .flat_map(|localities| localities.keys())
            .map(String::as_str)
            .collect()
    }

    /// Every distinct record address.
    pub fn addresses(&self) -> BTreeSet<&str> {
        self.months
            .values()
            .flat_map(|localities| localities.values())
            .flat_map(|entry| entry.days.values())
            .flatten()
            .map(|rec| rec.address.as_str())
            .collect()
    }
}
