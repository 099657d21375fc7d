//! Raw scraper output -> canonical dataset for one run.

use tracing::debug;
use turnos_core::{CanonicalDataset, Day, FormattedRecord, RawRecord, clean_phone, geocoding_address};

use crate::resolver::CoordinateResolver;

/// Normalize `records` into a dataset under `month`, resolving coordinates
/// for each one.
///
/// Records keep input order within their bucket and are not de-duplicated
/// here; that happens when the batch is merged into persisted state. The
/// first record seen for a locality fixes its source and confidence.
pub async fn format_records(
    resolver: &mut CoordinateResolver,
    records: &[RawRecord],
    month: &str,
) -> CanonicalDataset {
    let mut dataset = CanonicalDataset::new();

    for raw in records {
        let geocode_key = geocoding_address(&raw.address, &raw.locality);
        let map_url = raw.map_url.as_deref().filter(|u| !u.trim().is_empty());
        let coordinates = resolver.resolve(&geocode_key, map_url).await;

        let record = FormattedRecord {
            name: raw.name.trim().to_string(),
            address: raw.address.trim().to_string(),
            phone: clean_phone(Some(&raw.phone)),
            map_url: map_url.map(str::to_string),
            coordinates,
        };

        debug!(locality = %raw.locality, day = %raw.day_of_month, name = %record.name, "formatted record");
        dataset
            .locality_mut(month, raw.locality.trim(), &raw.source_url, raw.confidence)
            .days
            .entry(Day::parse(&raw.day_of_month))
            .or_default()
            .push(record);
    }

    dataset
}
