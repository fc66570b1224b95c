//! Core types for the Zero log decoder library
//!
//! This module defines the records the decoder produces when processing a
//! text log export: decoded entries, their open-ended conditions payload,
//! the small closed vocabularies (level, type, activity) and the error type.

use chrono::NaiveDateTime;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Timestamp type used throughout the decoder
///
/// Zero logs carry wall-clock time of the bike without any zone information.
pub type Timestamp = NaiveDateTime;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    /// The input is not a recognized Zero log export (fatal for the whole log)
    #[error("Not a recognized Zero log export: {0}")]
    Format(String),

    /// A single entry line could not be decoded (the line is skipped)
    #[error("Decoding line #{index} failed ({reason}) from content: {content}")]
    LineDecode {
        index: usize,
        content: String,
        reason: String,
    },

    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to render output: {0}")]
    Render(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Which subsystem emitted a log export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSource {
    /// Main bike board (controller log)
    Mbb,
    /// Battery management system
    Bms,
}

impl LogSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::Mbb => "MBB",
            LogSource::Bms => "BMS",
        }
    }
}

impl fmt::Display for LogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity prefix found at the start of an event message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventLevel {
    Info,
    Debug,
    Warning,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "INFO",
            EventLevel::Debug => "DEBUG",
            EventLevel::Warning => "WARNING",
            EventLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event taxonomy inferred from the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// Hex payload without a readable message
    Unknown,
    Riding,
    Charging,
    Enabling,
    Disabling,
    Connected,
    Disconnected,
    On,
    Off,
    Limit,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Unknown => "UNKNOWN",
            EventType::Riding => "RIDING",
            EventType::Charging => "CHARGING",
            EventType::Enabling => "ENABLING",
            EventType::Disabling => "DISABLING",
            EventType::Connected => "CONNECTED",
            EventType::Disconnected => "DISCONNECTED",
            EventType::On => "ON",
            EventType::Off => "OFF",
            EventType::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating state assigned to an entry by the segment annotator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SegmentActivity {
    #[default]
    Stopped,
    Started,
    Riding,
    Charging,
}

impl SegmentActivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentActivity::Stopped => "STOPPED",
            SegmentActivity::Started => "STARTED",
            SegmentActivity::Riding => "RIDING",
            SegmentActivity::Charging => "CHARGING",
        }
    }
}

impl fmt::Display for SegmentActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered key/value measurements embedded in an event message
///
/// Keys keep first-insertion order; inserting an existing key replaces its
/// value in place. Values are kept as text with their literal units
/// (e.g. `"93.175V"`, `"36C"`, `"9%"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    pairs: Vec<(String, String)>,
}

impl Conditions {
    /// Create an empty conditions map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the key's original position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    /// Key/value pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Append every pair of `other`, replacing values of keys already present
    pub fn extend(&mut self, other: Conditions) {
        for (key, value) in other.pairs {
            self.insert(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Conditions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut conditions = Conditions::new();
        for (key, value) in iter {
            conditions.insert(key, value);
        }
        conditions
    }
}

impl Serialize for Conditions {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A single decoded log entry - the primary output of the decoder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// 1-based entry number taken from the line's leading field
    pub sequence_number: u32,
    /// Time of the entry (`None` when the time field is empty or unparseable)
    pub timestamp: Option<Timestamp>,
    /// Emitting component (`MBB` unless the message names another one)
    pub component: String,
    pub event_type: Option<EventType>,
    pub event_level: Option<EventLevel>,
    /// Free-text description with level prefix and conditions removed
    pub event: String,
    pub conditions: Conditions,
    /// Segment identifier (assigned by the segment annotator)
    pub segment_id: u32,
    /// Segment activity (assigned by the segment annotator)
    pub segment_activity: SegmentActivity,
}

impl LogEntry {
    /// Whether the message carried one of the known level prefixes
    pub fn has_log_level(&self) -> bool {
        self.event_level.is_some()
    }

    pub fn is_battery_event(&self) -> bool {
        self.component == crate::rules::BATTERY_COMPONENT
    }

    /// Battery module number referenced by this entry, if any
    pub fn battery_module_no(&self) -> Option<u32> {
        self.conditions.get("Module")?.trim().parse().ok()
    }
}
