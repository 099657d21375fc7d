//! Coordinate resolution and record formatting.
//!
//! The expensive path is the browser lookup, gated behind the `chrome`
//! feature; everything else (map-link extraction, caching, formatting) is
//! always available.

pub mod extract;
pub mod formatter;
pub mod navigator;
pub mod resolver;

#[cfg(feature = "chrome")]
mod chrome;
#[cfg(feature = "chrome")]
pub use chrome::ChromeNavigator;

pub use extract::{extract_coordinates, search_url};
pub use formatter::format_records;
pub use navigator::{NavigateError, Navigator};
pub use resolver::{CoordinateResolver, DEFAULT_SETTLE_DELAY, ResolverStats};
