//! Conditions payload extraction
//!
//! Event messages carry measurements as `Key: value` runs after the prose,
//! e.g. `Riding   PackTemp: h 21C, l 20C, PackSOC: 91%, Vpack:113.044V`.
//! A key is one or two words directly followed by a colon; its value runs up
//! to the next key.

use crate::types::Conditions;
use regex::Regex;
use std::sync::LazyLock;

/// One or two words immediately followed by `:` (plus any spacing after the colon)
static KEYWORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z]+(?: [A-Za-z]+)?):\s*").unwrap());

/// Split event text into the prose part and the conditions payload
///
/// The payload starts at the first keyword. A two-word keyword only starts it
/// when a column gap (two or more spaces) precedes it; otherwise its first
/// word stays with the prose. Both parts are trimmed; without a keyword the
/// whole text is prose.
pub fn split_payload(text: &str) -> (&str, Option<&str>) {
    let Some(caps) = KEYWORD_REGEX.captures(text) else {
        return (text.trim(), None);
    };
    let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
        return (text.trim(), None);
    };

    let mut start = whole.start();
    if let Some((first_word, _)) = key.as_str().split_once(' ') {
        if !text[..start].ends_with("  ") {
            start += first_word.len() + 1;
        }
    }
    (text[..start].trim(), Some(text[start..].trim()))
}

/// Tokenize a conditions payload into ordered key/value pairs
///
/// A value made of comma-separated `word value` pairs is expanded into
/// composite keys (`PackTemp: h 21C, l 20C` gives `PackTemp (h) = 21C` and
/// `PackTemp (l) = 20C`). Any other value is kept verbatim, units included.
pub fn parse_conditions(payload: &str) -> Conditions {
    let mut conditions = Conditions::new();
    let keys: Vec<_> = KEYWORD_REGEX.captures_iter(payload).collect();

    for (i, caps) in keys.iter().enumerate() {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value_end = keys
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(payload.len(), |next| next.start());
        let value = trim_value(&payload[whole.end()..value_end]);
        insert_value(&mut conditions, key.as_str(), value);
    }

    conditions
}

fn trim_value(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| c == ',' || c.is_whitespace())
        .trim()
}

fn insert_value(conditions: &mut Conditions, key: &str, value: &str) {
    if value.contains(',') {
        let pairs: Option<Vec<(&str, &str)>> = value
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| {
                piece
                    .split_once(char::is_whitespace)
                    .map(|(inner_key, inner_value)| (inner_key, inner_value.trim()))
                    .filter(|(_, inner_value)| !inner_value.is_empty())
            })
            .collect();

        if let Some(pairs) = pairs.filter(|p| !p.is_empty()) {
            for (inner_key, inner_value) in pairs {
                conditions.insert(format!("{} ({})", key, inner_key), inner_value);
            }
            return;
        }
    }

    conditions.insert(key, value);
}
