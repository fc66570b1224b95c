//! Decoder configuration types
//!
//! This module defines the minimal configuration needed by the decoder library:
//! where the fixed fields of an entry line live and how timestamps are read.
//! Everything else (output paths, formats, merging) belongs to the application layer.

use crate::types::{DecoderError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Character span of the entry number (used when header columns are unusable)
    #[serde(default = "default_sequence_column")]
    pub sequence_column: ColumnSpan,

    /// Character span of the timestamp (used when header columns are unusable)
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: ColumnSpan,

    /// Derive column spans from the `+` positions of the header divider line
    #[serde(default = "default_true")]
    pub use_header_columns: bool,

    /// chrono format strings tried in order when reading a timestamp
    #[serde(default = "default_timestamp_formats")]
    pub timestamp_formats: Vec<String>,

    /// Lines shorter than this (in characters) are blank padding and skipped silently
    #[serde(default = "default_min_line_length")]
    pub min_line_length: usize,
}

fn default_true() -> bool {
    true
}

fn default_sequence_column() -> ColumnSpan {
    ColumnSpan::new(0, 9)
}

fn default_timestamp_column() -> ColumnSpan {
    ColumnSpan::new(10, 32)
}

fn default_timestamp_formats() -> Vec<String> {
    vec![
        "%m/%d/%Y %H:%M:%S".to_string(),
        "%Y-%m-%d %H:%M:%S".to_string(),
        "%m/%d/%Y %H:%M".to_string(),
    ]
}

fn default_min_line_length() -> usize {
    6
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            sequence_column: default_sequence_column(),
            timestamp_column: default_timestamp_column(),
            use_header_columns: true,
            timestamp_formats: default_timestamp_formats(),
            min_line_length: default_min_line_length(),
        }
    }
}

/// Half-open character range `[start, end)` within an entry line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
}

impl ColumnSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Resolved layout of an entry line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryColumns {
    pub sequence: ColumnSpan,
    pub timestamp: ColumnSpan,
    /// First character of the message text
    pub message_start: usize,
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the fallback column spans
    pub fn with_columns(mut self, sequence: ColumnSpan, timestamp: ColumnSpan) -> Self {
        self.sequence_column = sequence;
        self.timestamp_column = timestamp;
        self
    }

    /// Builder method: enable or disable header-derived column spans
    pub fn with_header_columns(mut self, enabled: bool) -> Self {
        self.use_header_columns = enabled;
        self
    }

    /// Builder method: append a timestamp format (tried after the existing ones)
    pub fn add_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_formats.push(format.into());
        self
    }

    /// Builder method: set the blank-line threshold
    pub fn with_min_line_length(mut self, length: usize) -> Self {
        self.min_line_length = length;
        self
    }

    /// Check the configuration for spans and formats that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.sequence_column.is_empty() {
            return Err(DecoderError::InvalidConfig(
                "sequence column span is empty".to_string(),
            ));
        }
        if self.timestamp_column.is_empty() {
            return Err(DecoderError::InvalidConfig(
                "timestamp column span is empty".to_string(),
            ));
        }
        if self.timestamp_column.start < self.sequence_column.end {
            return Err(DecoderError::InvalidConfig(format!(
                "timestamp column ({}..{}) overlaps sequence column ({}..{})",
                self.timestamp_column.start,
                self.timestamp_column.end,
                self.sequence_column.start,
                self.sequence_column.end
            )));
        }
        if self.timestamp_formats.is_empty() {
            return Err(DecoderError::InvalidConfig(
                "at least one timestamp format is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the entry line layout
    ///
    /// With header columns enabled and at least three divider boundaries
    /// (`+` positions), the entry number sits between the first two, the
    /// timestamp between the second and third, and the message follows.
    /// Otherwise the configured fallback spans are used.
    pub fn entry_columns(&self, boundaries: &[usize]) -> EntryColumns {
        if self.use_header_columns && boundaries.len() >= 3 {
            let sequence = ColumnSpan::new(boundaries[0], boundaries[1]);
            let timestamp = ColumnSpan::new(boundaries[1] + 1, boundaries[2]);
            if !sequence.is_empty() && !timestamp.is_empty() {
                return EntryColumns {
                    sequence,
                    timestamp,
                    message_start: boundaries[2] + 1,
                };
            }
            log::debug!(
                "Header column boundaries {:?} are unusable, falling back to configured spans",
                boundaries
            );
        }

        EntryColumns {
            sequence: self.sequence_column,
            timestamp: self.timestamp_column,
            message_start: self.timestamp_column.end + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_columns(ColumnSpan::new(0, 7), ColumnSpan::new(8, 27))
            .with_header_columns(false)
            .add_timestamp_format("%d.%m.%Y %H:%M:%S")
            .with_min_line_length(3);

        assert_eq!(config.sequence_column, ColumnSpan::new(0, 7));
        assert!(!config.use_header_columns);
        assert_eq!(config.timestamp_formats.len(), 4);
        assert_eq!(config.min_line_length, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_entry_columns_from_header_boundaries() {
        let config = DecoderConfig::new();
        let columns = config.entry_columns(&[0, 9, 32, 59]);

        assert_eq!(columns.sequence, ColumnSpan::new(0, 9));
        assert_eq!(columns.timestamp, ColumnSpan::new(10, 32));
        assert_eq!(columns.message_start, 33);
    }

    #[test]
    fn test_entry_columns_fallback() {
        let config = DecoderConfig::new();

        // Too few boundaries
        let columns = config.entry_columns(&[0, 9]);
        assert_eq!(columns.timestamp, ColumnSpan::new(10, 32));
        assert_eq!(columns.message_start, 33);

        // Header columns disabled
        let config = DecoderConfig::new()
            .with_header_columns(false)
            .with_columns(ColumnSpan::new(0, 5), ColumnSpan::new(6, 20));
        let columns = config.entry_columns(&[0, 9, 32, 59]);
        assert_eq!(columns.sequence, ColumnSpan::new(0, 5));
        assert_eq!(columns.message_start, 21);
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let config = DecoderConfig::new()
            .with_columns(ColumnSpan::new(0, 12), ColumnSpan::new(10, 32));
        assert!(matches!(
            config.validate(),
            Err(DecoderError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_deserialization_defaults() {
        let config: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert!(config.use_header_columns);
        assert_eq!(config.timestamp_formats[0], "%m/%d/%Y %H:%M:%S");
        assert_eq!(config.min_line_length, 6);
    }
}
