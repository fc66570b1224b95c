//! Tabular value formatting
//!
//! Condition values keep their literal units (`93.175V`, `36C`, `3280mV`).
//! For tabular output the caller can ask for bare numbers instead.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// `<int>mV`, rendered as volts when units are omitted
static MILLIVOLT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d+)mV$").unwrap());

/// A number immediately followed by a unit suffix
static UNIT_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(-?\d*\.?\d+)[A-Za-z%]+$").unwrap());

/// Render a nullable scalar for CSV/TSV, treating `None` as empty text
pub fn format_tabular(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_default()
}

/// Strip a trailing unit from a numeric value
///
/// Millivolt readings are converted to volts (`3280mV` -> `3.28`); any other
/// number followed directly by letters or `%` loses the suffix
/// (`93.175V` -> `93.175`). Values that are not a number with a unit are
/// returned unchanged.
pub fn strip_units(value: &str) -> Cow<'_, str> {
    let trimmed = value.trim();

    if let Some(caps) = MILLIVOLT_REGEX.captures(trimmed) {
        if let Ok(millivolts) = caps[1].parse::<i64>() {
            return Cow::Owned(format!("{}", millivolts as f64 / 1000.0));
        }
    }

    if let Some(caps) = UNIT_SUFFIX_REGEX.captures(trimmed) {
        if let Some(number) = caps.get(1) {
            return Cow::Owned(number.as_str().to_string());
        }
    }

    Cow::Borrowed(value)
}

/// Render a condition value, optionally omitting its unit
pub fn render_value(value: Option<&str>, omit_units: bool) -> String {
    match value {
        Some(v) if omit_units => strip_units(v).into_owned(),
        other => format_tabular(other),
    }
}
