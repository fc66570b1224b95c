//! Event text rule tables
//!
//! Ordered `(pattern, tag)` tables used by the entry decoder. Every table is
//! evaluated first-match-wins; the order of rows is significant.

use crate::types::{EventLevel, EventType};
use regex::Regex;
use std::sync::LazyLock;

/// Component assigned when no rule names another one
pub const DEFAULT_COMPONENT: &str = "MBB";

pub const BATTERY_COMPONENT: &str = "Battery";

/// Messages starting with this are battery module events
pub const MODULE_PREFIX: &str = "Module ";

/// Fallback marker for error messages without an `ERROR:` prefix
pub const ERROR_MARKER: &str = " error";

/// Event text of the primary contactor closing (after module extraction)
pub const CONTACTOR_CLOSING_MESSAGE: &str = "Module Closing Contactor";

/// Event text of the primary contactor opening (after module extraction)
pub const CONTACTOR_OPENING_MESSAGE: &str = "Module Opening Contactor";

/// Messages starting with this are ON/OFF events decided by their on/off token
pub const TURNING_PREFIX: &str = "Turning";

/// Messages mentioning charging are CHARGING events unless leaving it
pub const CHARGING_MARKER: &str = "Charging";
pub const FROM_CHARGING_MARKER: &str = "from Charging";

/// Messages mentioning a limit (any case) are LIMIT events
pub const LIMIT_MARKER: &str = "LIMIT";

/// Level prefixes, stripped from the message when matched
pub const LEVEL_PREFIXES: &[(&str, EventLevel)] = &[
    ("INFO:", EventLevel::Info),
    ("DEBUG:", EventLevel::Debug),
    ("- DEBUG:", EventLevel::Debug),
    ("WARNING:", EventLevel::Warning),
    ("ERROR:", EventLevel::Error),
];

/// Message prefix -> event type
pub const TYPE_PREFIX_RULES: &[(&str, EventType)] = &[
    ("0x", EventType::Unknown),
    ("Riding", EventType::Riding),
    ("Charging", EventType::Charging),
    ("Enabling", EventType::Enabling),
    ("Disabling", EventType::Disabling),
];

/// Message suffix -> event type (evaluated after, and overriding, the prefix rules)
pub const TYPE_SUFFIX_RULES: &[(&str, EventType)] = &[
    (" Connected", EventType::Connected),
    (" Disconnected", EventType::Disconnected),
    (" Link Up", EventType::Connected),
    (" Link Down", EventType::Disconnected),
    (" On", EventType::On),
    (" Off", EventType::Off),
];

/// Message substring -> component
pub const COMPONENT_RULES: &[(&str, &str)] = &[
    ("Battery", BATTERY_COMPONENT),
    ("Sevcon", "Controller"),
    ("DCDC", "DC-DC Converter"),
    ("Calex", "Charger"),
    ("External Chg", "External Charger"),
    ("Charger 6", "Charge Tank"),
];

/// A known message whose trailing numbers are moved into conditions
pub struct SpecialMessage {
    /// Canonical event text once decoded
    pub message: &'static str,
    pattern: &'static str,
    /// Condition key for each capture group, in group order
    pub keys: &'static [&'static str],
}

pub const SPECIAL_MESSAGES: &[SpecialMessage] = &[
    SpecialMessage {
        message: "Batt Dischg Cur Limited",
        pattern: r"(\d+) A \((\d+\.?\d+%)\)",
        keys: &["BattAmps", "PackSOC"],
    },
    SpecialMessage {
        message: "Low Chassis Isolation",
        pattern: r"(\d+ KOhms) to cell (\d+)",
        keys: &["ImpedanceKOhms", "Cell"],
    },
];

static SPECIAL_MESSAGE_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SPECIAL_MESSAGES
        .iter()
        .map(|special| Regex::new(special.pattern).unwrap())
        .collect()
});

/// Messages followed by a comma-separated `<label words> <value>` list
pub const LISTED_MESSAGES: &[&str] = &["Module not connected"];

/// First rule whose pattern starts `text`
pub fn match_prefix<T: Copy>(rules: &[(&'static str, T)], text: &str) -> Option<(&'static str, T)> {
    rules
        .iter()
        .find(|(pattern, _)| text.starts_with(pattern))
        .copied()
}

/// First rule whose pattern ends `text`
pub fn match_suffix<T: Copy>(rules: &[(&'static str, T)], text: &str) -> Option<(&'static str, T)> {
    rules
        .iter()
        .find(|(pattern, _)| text.ends_with(pattern))
        .copied()
}

/// First rule whose pattern occurs anywhere in `text`
pub fn match_substring<T: Copy>(rules: &[(&'static str, T)], text: &str) -> Option<(&'static str, T)> {
    rules
        .iter()
        .find(|(pattern, _)| text.contains(pattern))
        .copied()
}

/// Decode one of the special messages, if `text` starts with one and its payload matches
///
/// Returns the canonical message and the extracted `(key, value)` pairs.
pub fn match_special_message(text: &str) -> Option<(&'static str, Vec<(&'static str, String)>)> {
    SPECIAL_MESSAGES
        .iter()
        .zip(SPECIAL_MESSAGE_REGEXES.iter())
        .filter(|(special, _)| text.starts_with(special.message))
        .find_map(|(special, regex)| {
            let caps = regex.captures(text)?;
            let values = special
                .keys
                .iter()
                .enumerate()
                .filter_map(|(i, key)| caps.get(i + 1).map(|m| (*key, m.as_str().to_string())))
                .collect();
            Some((special.message, values))
        })
}

/// Decode one of the listed messages, if `text` is one followed by its list
///
/// Each comma-separated piece whose last token starts with a digit becomes a
/// `(label, value)` pair; other pieces (`last CAN msg 4ms ago`) are dropped.
pub fn match_listed_message(text: &str) -> Option<(&'static str, Vec<(String, String)>)> {
    let message = LISTED_MESSAGES
        .iter()
        .copied()
        .find(|message| text.starts_with(message))?;
    let list = text[message.len()..].trim_start().strip_prefix(',')?;
    let values = list.split(',').filter_map(labelled_value).collect();
    Some((message, values))
}

fn labelled_value(piece: &str) -> Option<(String, String)> {
    let (label, value) = piece.trim().rsplit_once(char::is_whitespace)?;
    if !value.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        return None;
    }
    Some((label, value.to_string()))
}
