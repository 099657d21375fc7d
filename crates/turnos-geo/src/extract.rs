//! Coordinate extraction from map-service URLs.
//!
//! Three patterns, tried in order:
//!
//! 1. an `@lat,lng` path segment (`.../maps/place/X/@-34.47,-58.52,17z`)
//! 2. a `destination=lat,lng` query parameter
//! 3. any bare `lat,lng` pair inside the Buenos Aires region box
//!    (latitude -30..-39, longitude -50..-59). Last resort: it can match
//!    unrelated numbers that happen to look like coordinates.
//!
//! Each pattern also runs against the percent-decoded URL so `%2C`-separated
//! pairs are found.

use std::sync::LazyLock;

use regex::Regex;
use turnos_core::Coordinates;
use url::Url;

static AT_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@(-?\d{1,3}(?:\.\d+)?),\s*(-?\d{1,3}(?:\.\d+)?)").expect("at-segment pattern")
});

static BARE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d.])(-3\d\.\d+)\s*,\s*(-5\d\.\d+)").expect("bare pair pattern")
});

/// Base URL of the map search used for browser lookups.
pub const SEARCH_BASE: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Map search URL for a free-text address.
pub fn search_url(address: &str) -> String {
    format!("{SEARCH_BASE}{}", urlencoding::encode(address))
}

/// Try every pattern in order and return the first match.
pub fn extract_coordinates(url: &str) -> Option<Coordinates> {
    let decoded = urlencoding::decode(url).map(|s| s.into_owned()).ok();
    let candidates: Vec<&str> = std::iter::once(url).chain(decoded.as_deref()).collect();

    let patterns: [fn(&str) -> Option<Coordinates>; 3] =
        [from_at_segment, from_destination_param, from_bare_pair];
    patterns
        .iter()
        .find_map(|pattern| candidates.iter().find_map(|&candidate| pattern(candidate)))
}

/// Pattern 1: `@lat,lng`.
pub fn from_at_segment(url: &str) -> Option<Coordinates> {
    let caps = AT_SEGMENT.captures(url)?;
    parse_pair(&caps[1], &caps[2])
}

/// Pattern 2: `destination=lat,lng` in the query string.
pub fn from_destination_param(url: &str) -> Option<Coordinates> {
    let parsed = Url::parse(url).ok()?;
    let (_, value) = parsed.query_pairs().find(|(key, _)| key == "destination")?;
    let (lat, lng) = value.split_once(',')?;
    parse_pair(lat, lng)
}

/// Pattern 3: a bare pair inside the regional bounding box.
pub fn from_bare_pair(url: &str) -> Option<Coordinates> {
    let caps = BARE_PAIR.captures(url)?;
    parse_pair(&caps[1], &caps[2])
}

fn parse_pair(lat: &str, lng: &str) -> Option<Coordinates> {
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(Coordinates::new(lat, lng))
}
