pub mod dataset;
pub mod merge;
pub mod normalize;
pub mod record;

pub use dataset::{CanonicalDataset, Day, LocalityEntry, current_month, month_name};
pub use merge::{MergeStats, merge, merge_with_stats};
pub use normalize::{clean_phone, expand_abbreviations, geocoding_address};
pub use record::{Coordinates, FormattedRecord, RawRecord};
