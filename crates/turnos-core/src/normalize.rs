//! Text cleanup applied before geocoding and persistence.
//!
//! Abbreviation expansion is table driven: [`ABBREVIATIONS`] lists
//! `(pattern, replacement)` pairs applied once each, in order. Only
//! abbreviations with a single possible reading belong in the table; anything
//! else passes through untouched.

use std::sync::LazyLock;

use regex::Regex;

/// Municipal abbreviations seen in the sources, as `(regex, replacement)`.
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    (r"\bSan Fdo\.", "San Fernando"),
    (r"\bS\. ?F\.", "San Fernando"),
    (r"\bVirr\.", "Virreyes"),
    (r"\bVict\.", "Victoria"),
];

static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    ABBREVIATIONS
        .iter()
        .map(|(pattern, replacement)| {
            (
                Regex::new(pattern).expect("abbreviation pattern"),
                *replacement,
            )
        })
        .collect()
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("whitespace"));

static REGION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3},\s*").expect("region prefix"));

/// Keep digits and a leading `+`; drop everything else.
///
/// `clean_phone(Some("Tel: +54 11-4567-8900")) == "+541145678900"`.
pub fn clean_phone(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_digit() || (c == '+' && out.is_empty()) {
            out.push(c);
        }
    }
    out
}

/// Apply the abbreviation table and collapse whitespace.
pub fn expand_abbreviations(address: &str) -> String {
    let mut text = address.to_string();
    for (re, replacement) in RULES.iter() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Drop a leading three-letter region tag such as `"SIS, "`.
pub fn strip_region_prefix(address: &str) -> String {
    REGION_PREFIX.replace(address.trim(), "").into_owned()
}

/// The string handed to the geocoder and used as the coordinate cache key:
/// the expanded address followed by `", <locality>"` unless the address
/// already names the locality.
pub fn geocoding_address(address: &str, locality: &str) -> String {
    let expanded = expand_abbreviations(address);
    let locality = locality.trim();
    if locality.is_empty() || expanded.to_lowercase().contains(&locality.to_lowercase()) {
        expanded
    } else {
        format!("{expanded}, {locality}")
    }
}
