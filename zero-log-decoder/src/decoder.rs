//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct holds the decoder configuration and turns log text,
//! from memory or from a file, into a [`LogDataset`].

use crate::config::DecoderConfig;
use crate::dataset::LogDataset;
use crate::types::{DecoderError, Result};
use std::fs;
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
#[derive(Debug, Clone)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a new decoder instance with the default configuration
    pub fn new() -> Self {
        Self {
            config: DecoderConfig::default(),
        }
    }

    /// Create a decoder with a custom configuration
    ///
    /// # Returns
    /// * `Err(DecoderError::InvalidConfig)` if the configuration is inconsistent
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a log given as lines
    pub fn decode_lines<I, S>(&self, lines: I) -> Result<LogDataset>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LogDataset::with_config(lines, self.config.clone())
    }

    /// Decode a log given as one text blob
    ///
    /// # Example
    /// ```
    /// use zero_log_decoder::Decoder;
    ///
    /// let text = [
    ///     "Zero MBB log",
    ///     "Entries: 1 of 1",
    ///     " Entry    Time of Log            Event",
    ///     "+--------+----------------------+------------",
    ///     " 00001     05/13/2018 10:06:43   Disarmed",
    /// ]
    /// .join("\n");
    /// let dataset = Decoder::new().decode_str(&text).unwrap();
    /// assert_eq!(dataset.entries()[0].event, "Disarmed");
    /// ```
    pub fn decode_str(&self, text: &str) -> Result<LogDataset> {
        self.decode_lines(text.lines())
    }

    /// Decode a text log file
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    ///
    /// # Arguments
    /// * `path` - Path to the decoded log export
    ///
    /// # Returns
    /// * `Result<LogDataset>` - Err if the file cannot be read or has no header
    ///
    /// # Example
    /// ```no_run
    /// use zero_log_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let dataset = Decoder::new().decode_file(Path::new("VIN_MBB_2018-05-21.txt")).unwrap();
    /// for entry in dataset.entries() {
    ///     println!("{} {}", entry.sequence_number, entry.event);
    /// }
    /// ```
    pub fn decode_file(&self, path: &Path) -> Result<LogDataset> {
        log::info!("Decoding log file: {:?}", path);

        let bytes = fs::read(path)?;
        if bytes.is_empty() {
            return Err(DecoderError::Format(format!("{:?} is empty", path)));
        }
        let text = String::from_utf8_lossy(&bytes);
        self.decode_str(&text)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
