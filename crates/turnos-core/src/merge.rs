//! Incremental merge of a fresh scrape into the persisted dataset.
//!
//! Argument order matters: `existing` is the persisted state, `incoming` the
//! fresh batch. Within a `(month, locality, day)` bucket records are keyed by
//! address; an incoming record replaces the existing one at the same position,
//! new addresses are appended. Applying the same `incoming` twice is a no-op.

use std::collections::HashMap;
use std::collections::btree_map::Entry;

use crate::dataset::{CanonicalDataset, LocalityEntry};
use crate::record::FormattedRecord;

/// Counts of what a merge changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub months_added: usize,
    pub localities_added: usize,
    pub days_added: usize,
    pub replaced: usize,
    pub appended: usize,
}

/// Merge `incoming` into `existing`.
pub fn merge(existing: CanonicalDataset, incoming: CanonicalDataset) -> CanonicalDataset {
    merge_with_stats(existing, incoming).0
}

/// Merge `incoming` into `existing`, reporting what changed.
pub fn merge_with_stats(
    mut existing: CanonicalDataset,
    incoming: CanonicalDataset,
) -> (CanonicalDataset, MergeStats) {
    let mut stats = MergeStats::default();

    for (month, localities) in incoming.months {
        match existing.months.entry(month) {
            Entry::Vacant(slot) => {
                stats.months_added += 1;
                slot.insert(localities);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                for (locality, entry) in localities {
                    match current.entry(locality) {
                        Entry::Vacant(slot) => {
                            stats.localities_added += 1;
                            slot.insert(entry);
                        }
                        Entry::Occupied(mut slot) => {
                            merge_locality(slot.get_mut(), entry, &mut stats);
                        }
                    }
                }
            }
        }
    }

    (existing, stats)
}

fn merge_locality(existing: &mut LocalityEntry, incoming: LocalityEntry, stats: &mut MergeStats) {
    existing.source = incoming.source;
    existing.confidence = incoming.confidence;

    for (day, records) in incoming.days {
        match existing.days.entry(day) {
            Entry::Vacant(slot) => {
                stats.days_added += 1;
                slot.insert(records);
            }
            Entry::Occupied(mut slot) => merge_day(slot.get_mut(), records, stats),
        }
    }
}

fn merge_day(existing: &mut Vec<FormattedRecord>, incoming: Vec<FormattedRecord>, stats: &mut MergeStats) {
    // Last position wins for addresses that already appear more than once.
    let positions: HashMap<String, usize> = existing
        .iter()
        .enumerate()
        .map(|(idx, rec)| (rec.address.clone(), idx))
        .collect();

    for mut record in incoming {
        match positions.get(&record.address) {
            Some(&idx) => {
                let previous = &existing[idx];
                if !record.coordinates.is_resolved() && previous.coordinates.is_resolved() {
                    record.coordinates = previous.coordinates;
                }
                if existing[idx] != record {
                    stats.replaced += 1;
                }
                existing[idx] = record;
            }
            None => {
                stats.appended += 1;
                existing.push(record);
            }
        }
    }
}
