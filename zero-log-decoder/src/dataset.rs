//! Decoded log dataset
//!
//! A [`LogDataset`] owns the raw lines of one log export together with the
//! header and the annotated entries decoded from them. It computes the
//! tabular schema (fixed columns plus every condition key seen) and renders
//! the entries as CSV/TSV lines or as a JSON record tree.

use crate::config::DecoderConfig;
use crate::entry_decoder::EntryDecoder;
use crate::header::{HeaderParser, LogHeader};
use crate::segment::SegmentAnnotator;
use crate::types::{Conditions, DecoderError, LogEntry, LogSource, Result};
use crate::units;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Columns present in every rendered row, in order
pub const FIXED_COLUMNS: [&str; 8] = [
    "entry",
    "segment_id",
    "segment_activity",
    "timestamp",
    "component",
    "event_type",
    "event_level",
    "event",
];

/// Timestamp layout used in rendered output
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output format of a rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    #[default]
    Tsv,
    Json,
}

impl OutputFormat {
    /// Field delimiter for the tabular formats
    pub fn delimiter(&self) -> Option<u8> {
        match self {
            OutputFormat::Csv => Some(b','),
            OutputFormat::Tsv => Some(b'\t'),
            OutputFormat::Json => None,
        }
    }

    /// File extension (and CLI name) of the format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            other => Err(DecoderError::InvalidConfig(format!(
                "unknown output format '{}' (expected csv, tsv or json)",
                other
            ))),
        }
    }
}

/// Result of rendering a dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Delimited text lines, column header first
    Lines(Vec<String>),
    /// Header metadata plus entry records
    Json(serde_json::Value),
}

/// JSON-shaped view of one entry
#[derive(Debug, Serialize)]
pub struct EntryRecord<'a> {
    pub entry: u32,
    pub timestamp: String,
    pub segment_id: u32,
    pub segment_activity: &'static str,
    pub component: &'a str,
    pub event_type: &'static str,
    pub event_level: &'static str,
    pub event: &'a str,
    pub conditions: Conditions,
}

impl<'a> EntryRecord<'a> {
    pub fn new(entry: &'a LogEntry, omit_units: bool) -> Self {
        let conditions = if omit_units {
            entry
                .conditions
                .iter()
                .map(|(key, value)| (key, units::strip_units(value).into_owned()))
                .collect()
        } else {
            entry.conditions.clone()
        };

        Self {
            entry: entry.sequence_number,
            timestamp: format_timestamp(entry),
            segment_id: entry.segment_id,
            segment_activity: entry.segment_activity.as_str(),
            component: &entry.component,
            event_type: entry.event_type.map_or("", |t| t.as_str()),
            event_level: entry.event_level.map_or("", |l| l.as_str()),
            event: &entry.event,
            conditions,
        }
    }
}

fn format_timestamp(entry: &LogEntry) -> String {
    entry
        .timestamp
        .map(|t| t.format(OUTPUT_TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

/// Render one entry as a row: the fixed columns, then one cell per condition key
pub fn entry_row(entry: &LogEntry, condition_keys: &[&str], omit_units: bool) -> Vec<String> {
    let mut row = Vec::with_capacity(FIXED_COLUMNS.len() + condition_keys.len());
    row.push(entry.sequence_number.to_string());
    row.push(entry.segment_id.to_string());
    row.push(entry.segment_activity.to_string());
    row.push(format_timestamp(entry));
    row.push(entry.component.clone());
    row.push(units::format_tabular(entry.event_type.map(|t| t.as_str())));
    row.push(units::format_tabular(entry.event_level.map(|l| l.as_str())));
    row.push(entry.event.clone());
    row.extend(
        condition_keys
            .iter()
            .map(|key| units::render_value(entry.conditions.get(key), omit_units)),
    );
    row
}

/// Ordered union of the condition keys of `entries`, first-seen order
pub fn condition_keys<'a, I>(entries: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a LogEntry>,
{
    let mut keys: Vec<&'a str> = Vec::new();
    for entry in entries {
        for key in entry.conditions.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Write one record as a delimited line (no terminator)
pub fn delimited_line<I, T>(fields: I, delimiter: u8) -> Result<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| DecoderError::Render(e.to_string()))?;
    let line = String::from_utf8(bytes).map_err(|e| DecoderError::Render(e.to_string()))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// One decoded log
#[derive(Debug)]
pub struct LogDataset {
    lines: Vec<String>,
    config: DecoderConfig,
    header: LogHeader,
    entries: Vec<LogEntry>,
    errors: Vec<DecoderError>,
}

impl LogDataset {
    /// Decode a log from its lines with the default configuration
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(lines, DecoderConfig::default())
    }

    /// Decode a log from its lines
    ///
    /// # Returns
    /// * `Err(DecoderError::Format)` if the header has no divider row
    /// * `Err(DecoderError::InvalidConfig)` if `config` is inconsistent
    ///
    /// Lines that fail to decode are skipped and kept in [`errors`](Self::errors).
    pub fn with_config<I, S>(lines: I, config: DecoderConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        config.validate()?;
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let header = HeaderParser::parse(&lines)?;
        let (entries, errors) = Self::decode_entries(&lines, &header, &config);

        log::info!(
            "Decoded {} entries from {:?} log ({} lines skipped)",
            entries.len(),
            header.source,
            errors.len()
        );
        if let Some(announced) = header.entry_count_actual {
            if announced as usize != entries.len() {
                log::debug!("Header announces {} entries, decoded {}", announced, entries.len());
            }
        }

        Ok(Self {
            lines,
            config,
            header,
            entries,
            errors,
        })
    }

    fn decode_entries(
        lines: &[String],
        header: &LogHeader,
        config: &DecoderConfig,
    ) -> (Vec<LogEntry>, Vec<DecoderError>) {
        let columns = config.entry_columns(&header.column_boundaries);
        let decoder = EntryDecoder::new(config, columns);
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for (index, line) in lines.iter().enumerate().skip(header.line_count) {
            if line.trim_end().chars().count() < config.min_line_length {
                continue;
            }
            match decoder.decode_line(index, line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    log::warn!("Skipping line: {}", e);
                    errors.push(e);
                }
            }
        }

        SegmentAnnotator::annotate(&mut entries);
        (entries, errors)
    }

    /// Re-decode every entry from the retained lines
    pub fn refresh(&mut self) -> Result<()> {
        self.header = HeaderParser::parse(&self.lines)?;
        let (entries, errors) = Self::decode_entries(&self.lines, &self.header, &self.config);
        self.entries = entries;
        self.errors = errors;
        Ok(())
    }

    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    pub fn source(&self) -> Option<LogSource> {
        self.header.source
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Lines skipped while decoding, as `LineDecode` errors
    pub fn errors(&self) -> &[DecoderError] {
        &self.errors
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Every condition key present in any entry, first-seen order
    pub fn all_condition_keys(&self) -> Vec<&str> {
        condition_keys(&self.entries)
    }

    /// Full tabular schema: fixed columns then condition keys
    pub fn columns(&self) -> Vec<String> {
        FIXED_COLUMNS
            .iter()
            .copied()
            .chain(self.all_condition_keys())
            .map(str::to_string)
            .collect()
    }

    /// Render one entry against this dataset's schema
    pub fn row(&self, entry: &LogEntry, omit_units: bool) -> Vec<String> {
        entry_row(entry, &self.all_condition_keys(), omit_units)
    }

    /// JSON record tree: `{header, entries}`
    pub fn to_json(&self, omit_units: bool) -> Result<serde_json::Value> {
        let entries: Vec<EntryRecord<'_>> = self
            .entries
            .iter()
            .map(|entry| EntryRecord::new(entry, omit_units))
            .collect();
        Ok(serde_json::json!({
            "header": serde_json::to_value(self.header.to_record())?,
            "entries": serde_json::to_value(entries)?,
        }))
    }

    /// Render the dataset
    ///
    /// CSV/TSV yield the column header line followed by one line per entry;
    /// JSON yields the record tree of [`to_json`](Self::to_json).
    pub fn render(&self, format: OutputFormat, omit_units: bool) -> Result<Rendered> {
        let Some(delimiter) = format.delimiter() else {
            return self.to_json(omit_units).map(Rendered::Json);
        };

        let keys = self.all_condition_keys();
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(delimited_line(
            FIXED_COLUMNS.iter().copied().chain(keys.iter().copied()),
            delimiter,
        )?);
        for entry in &self.entries {
            lines.push(delimited_line(entry_row(entry, &keys, omit_units), delimiter)?);
        }
        Ok(Rendered::Lines(lines))
    }
}
