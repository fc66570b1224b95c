//! Log header parsing
//!
//! A Zero log export starts with a free-text header ending in a divider row:
//!
//! ```text
//! Zero MBB log
//!
//! Serial number      2015_mbb_48e0f7_00720
//! VIN                538SD9Z37GCG06073
//! Firmware rev.      51
//! Board rev.         3
//! Model              DSR
//!
//! Printing 8397 of 8397 log entries..
//!
//!  Entry    Time of Log            Event                      Conditions
//! +--------+----------------------+--------------------------+----------------------------------
//! ```
//!
//! The title names the log source, labeled lines carry source-specific
//! metadata, and the last lines give the entry counts, column labels, and
//! the column boundaries (the `+` positions of the divider).

use crate::types::{DecoderError, LogSource, Result};
use crate::vin::{decode_vin, VehicleInfo};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::sync::LazyLock;

/// Leading characters of the divider row closing the header
pub const DIVIDER_PREFIX: &str = "+-";

/// Format of the BMS `Initial date` header value
pub const INITIAL_DATE_FORMAT: &str = "%b %d %Y %H:%M:%S";

static INTEGER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static LABEL_SEPARATOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s\s+").unwrap());

/// Parsed header of one log export
#[derive(Debug, Clone, PartialEq)]
pub struct LogHeader {
    /// First line of the log, trimmed
    pub title: String,
    /// Log source named by the title (`None` if neither MBB nor BMS)
    pub source: Option<LogSource>,
    pub metadata: HeaderMetadata,
    /// Number of entries the export printed
    pub entry_count_actual: Option<u32>,
    /// Number of entries the export announced
    pub entry_count_expected: Option<u32>,
    /// Character positions of `+` in the divider row
    pub column_boundaries: Vec<usize>,
    /// Column labels (informational)
    pub column_labels: Vec<String>,
    /// Number of lines in the header block, divider included
    pub line_count: usize,
}

/// Source-specific metadata, selected once from the title
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderMetadata {
    Mbb(MbbMetadata),
    Bms(BmsMetadata),
    None,
}

/// Main bike board metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MbbMetadata {
    pub serial_no: Option<String>,
    pub vin: Option<String>,
    pub firmware_rev: Option<String>,
    pub board_rev: Option<String>,
    pub model: Option<String>,
}

impl MbbMetadata {
    /// Vehicle attributes decoded from the VIN, if present and decodable
    pub fn vehicle(&self) -> Option<VehicleInfo> {
        self.vin.as_deref().and_then(decode_vin)
    }
}

/// Battery management system metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BmsMetadata {
    pub serial_no: Option<String>,
    pub pack_serial_no: Option<String>,
    /// Raw `Initial date` text
    #[serde(serialize_with = "serialize_initial_date")]
    pub initial_date: Option<String>,
}

impl BmsMetadata {
    /// The `Initial date` value parsed as a date-time
    pub fn initial_datetime(&self) -> Option<NaiveDateTime> {
        self.initial_date.as_deref().and_then(parse_initial_date)
    }
}

fn parse_initial_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, INITIAL_DATE_FORMAT).ok()
}

fn serialize_initial_date<S>(value: &Option<String>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let parsed = value.as_deref().and_then(parse_initial_date);
    match (parsed, value) {
        (Some(date), _) => serializer.serialize_str(&date.format("%Y-%m-%d %H:%M:%S").to_string()),
        (None, Some(raw)) => serializer.serialize_str(raw),
        (None, None) => serializer.serialize_none(),
    }
}

/// JSON-shaped view of a header
#[derive(Debug, Serialize)]
pub struct HeaderRecord<'a> {
    pub source: Option<LogSource>,
    pub title: &'a str,
    pub num_entries: Option<u32>,
    pub num_entries_expected: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbb: Option<&'a MbbMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bms: Option<&'a BmsMetadata>,
    /// Vehicle decoded from the MBB VIN
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<VehicleInfo>,
}

impl LogHeader {
    /// Build the JSON-shaped record of this header
    pub fn to_record(&self) -> HeaderRecord<'_> {
        let (mbb, bms) = match &self.metadata {
            HeaderMetadata::Mbb(mbb) => (Some(mbb), None),
            HeaderMetadata::Bms(bms) => (None, Some(bms)),
            HeaderMetadata::None => (None, None),
        };
        HeaderRecord {
            source: self.source,
            title: &self.title,
            num_entries: self.entry_count_actual,
            num_entries_expected: self.entry_count_expected,
            mbb,
            bms,
            model: mbb.and_then(MbbMetadata::vehicle),
        }
    }
}

/// Header parser
pub struct HeaderParser;

impl HeaderParser {
    /// Parse the header block at the start of `lines`
    ///
    /// # Arguments
    /// * `lines` - All lines of one log, in order
    ///
    /// # Returns
    /// * `Result<LogHeader>` - Err(Format) if no divider row is found
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<LogHeader> {
        let divider_idx = lines
            .iter()
            .position(|line| Self::is_divider(line.as_ref()))
            .ok_or_else(|| {
                DecoderError::Format(format!(
                    "no header divider line (starting with '{}') found in {} lines",
                    DIVIDER_PREFIX,
                    lines.len()
                ))
            })?;

        let header_lines: Vec<&str> = lines[..=divider_idx]
            .iter()
            .map(|line| line.as_ref().trim_start_matches('\u{feff}'))
            .collect();

        let title = header_lines[0].trim().to_string();
        let source = Self::source_from_title(&title);
        let metadata = match source {
            Some(LogSource::Mbb) => HeaderMetadata::Mbb(MbbMetadata {
                serial_no: Self::value_from_lines(&header_lines, "Serial number"),
                vin: Self::value_from_lines(&header_lines, "VIN"),
                firmware_rev: Self::value_from_lines(&header_lines, "Firmware rev."),
                board_rev: Self::value_from_lines(&header_lines, "Board rev."),
                model: Self::value_from_lines(&header_lines, "Model"),
            }),
            Some(LogSource::Bms) => HeaderMetadata::Bms(BmsMetadata {
                serial_no: Self::value_from_lines(&header_lines, "BMS serial number"),
                pack_serial_no: Self::value_from_lines(&header_lines, "Pack serial number"),
                initial_date: Self::value_from_lines(&header_lines, "Initial date"),
            }),
            None => {
                log::debug!("Log title {:?} names no known source, skipping metadata", title);
                HeaderMetadata::None
            }
        };

        let divider = header_lines[divider_idx].trim_end();
        let column_boundaries: Vec<usize> = divider
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == '+')
            .map(|(i, _)| i)
            .collect();

        // The labels row sits right above the divider (absent in a one-line header)
        let labels_idx = divider_idx.checked_sub(1).filter(|&i| i > 0);
        let column_labels = labels_idx
            .map(|i| Self::column_labels(header_lines[i]))
            .unwrap_or_default();

        let (entry_count_actual, entry_count_expected) = labels_idx
            .and_then(|i| {
                header_lines[1..i]
                    .iter()
                    .rev()
                    .find(|line| !line.trim().is_empty())
            })
            .map(|line| Self::entry_counts(line))
            .unwrap_or((None, None));

        log::debug!(
            "Parsed {:?} header {:?}: {} boundaries, entries {:?}/{:?}",
            source,
            title,
            column_boundaries.len(),
            entry_count_actual,
            entry_count_expected
        );

        Ok(LogHeader {
            title,
            source,
            metadata,
            entry_count_actual,
            entry_count_expected,
            column_boundaries,
            column_labels,
            line_count: divider_idx + 1,
        })
    }

    /// Whether a line is the divider row closing the header
    pub fn is_divider(line: &str) -> bool {
        line.trim_start_matches('\u{feff}')
            .trim_start()
            .starts_with(DIVIDER_PREFIX)
    }

    fn source_from_title(title: &str) -> Option<LogSource> {
        if title.contains("MBB") {
            Some(LogSource::Mbb)
        } else if title.contains("BMS") {
            Some(LogSource::Bms)
        } else {
            None
        }
    }

    /// Find the first header line starting with `prefix` and return the rest of it
    fn value_from_lines(lines: &[&str], prefix: &str) -> Option<String> {
        lines
            .iter()
            .map(|line| line.trim())
            .find(|line| line.starts_with(prefix))
            .map(|line| line[prefix.len()..].trim().to_string())
    }

    /// First two integers of the entry count line (actual, expected)
    fn entry_counts(line: &str) -> (Option<u32>, Option<u32>) {
        let counts: Vec<u32> = INTEGER_REGEX
            .find_iter(line)
            .filter_map(|m| m.as_str().parse().ok())
            .take(2)
            .collect();
        match counts.as_slice() {
            [actual, expected] => (Some(*actual), Some(*expected)),
            _ => (None, None),
        }
    }

    fn column_labels(line: &str) -> Vec<String> {
        LABEL_SEPARATOR_REGEX
            .split(line.trim())
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MBB_HEADER: &str = "Zero MBB log

Serial number      2015_mbb_48e0f7_00720
VIN                538SD9Z37GCG06073
Firmware rev.      51
Board rev.         3
Model              DSR

Printing 8397 of 8397 log entries..

 Entry    Time of Log            Event                      Conditions
+--------+----------------------+--------------------------+----------------------------------
 00001     05/13/2018 10:06:43   DEBUG: Sevcon Contactor Drive ON.";

    const BMS_HEADER: &str = "\u{feff}Zero BMS log

BMS serial number   2014_bms_1234
Pack serial number  2014_pack_5678
Initial date        May 13 2018 10:06:43

Printing 120 of 125 log entries..

 Entry    Time of Log            Event                      Conditions
+--------+----------------------+--------------------------+----------------------------------";

    fn lines(text: &str) -> Vec<&str> {
        text.lines().collect()
    }

    #[test]
    fn test_parse_mbb_header() {
        let header = HeaderParser::parse(&lines(MBB_HEADER)).unwrap();

        assert_eq!(header.title, "Zero MBB log");
        assert_eq!(header.source, Some(LogSource::Mbb));
        assert_eq!(header.entry_count_actual, Some(8397));
        assert_eq!(header.entry_count_expected, Some(8397));
        assert_eq!(header.column_boundaries, vec![0, 9, 32, 59]);
        assert_eq!(
            header.column_labels,
            vec!["Entry", "Time of Log", "Event", "Conditions"]
        );
        assert_eq!(header.line_count, 12);

        match &header.metadata {
            HeaderMetadata::Mbb(mbb) => {
                assert_eq!(mbb.serial_no.as_deref(), Some("2015_mbb_48e0f7_00720"));
                assert_eq!(mbb.vin.as_deref(), Some("538SD9Z37GCG06073"));
                assert_eq!(mbb.firmware_rev.as_deref(), Some("51"));
                assert_eq!(mbb.board_rev.as_deref(), Some("3"));
                assert_eq!(mbb.model.as_deref(), Some("DSR"));
            }
            other => panic!("expected MBB metadata, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bms_header_with_bom() {
        let header = HeaderParser::parse(&lines(BMS_HEADER)).unwrap();

        assert_eq!(header.title, "Zero BMS log");
        assert_eq!(header.source, Some(LogSource::Bms));
        assert_eq!(header.entry_count_actual, Some(120));
        assert_eq!(header.entry_count_expected, Some(125));

        let HeaderMetadata::Bms(bms) = &header.metadata else {
            panic!("expected BMS metadata");
        };
        assert_eq!(bms.serial_no.as_deref(), Some("2014_bms_1234"));
        assert_eq!(bms.pack_serial_no.as_deref(), Some("2014_pack_5678"));
        assert_eq!(
            bms.initial_datetime().map(|d| d.to_string()),
            Some("2018-05-13 10:06:43".to_string())
        );
    }

    #[test]
    fn test_missing_labels_are_unset() {
        let text = "Zero MBB log\nModel   DSR\n\n Entry  Time\n+-----+-----+";
        let header = HeaderParser::parse(&lines(text)).unwrap();

        let HeaderMetadata::Mbb(mbb) = &header.metadata else {
            panic!("expected MBB metadata");
        };
        assert_eq!(mbb.serial_no, None);
        assert_eq!(mbb.vin, None);
        assert_eq!(mbb.model.as_deref(), Some("DSR"));
        assert_eq!(header.entry_count_actual, None);
        assert_eq!(header.entry_count_expected, None);
        assert_eq!(header.column_boundaries, vec![0, 6, 12]);
    }

    #[test]
    fn test_unknown_source_has_no_metadata() {
        let text = "Some other log\n\n Entry  Time\n+-----+-----+";
        let header = HeaderParser::parse(&lines(text)).unwrap();
        assert_eq!(header.source, None);
        assert_eq!(header.metadata, HeaderMetadata::None);
    }

    #[test]
    fn test_missing_divider_is_format_error() {
        let result = HeaderParser::parse(&lines("Zero MBB log\nVIN  538SD9Z37GCG06073\n"));
        assert!(matches!(result, Err(DecoderError::Format(_))));

        let empty: Vec<&str> = Vec::new();
        assert!(matches!(
            HeaderParser::parse(&empty),
            Err(DecoderError::Format(_))
        ));
    }

    #[test]
    fn test_header_record_json() {
        let header = HeaderParser::parse(&lines(MBB_HEADER)).unwrap();
        let json = serde_json::to_value(header.to_record()).unwrap();

        assert_eq!(json["source"], "MBB");
        assert_eq!(json["num_entries"], 8397);
        assert_eq!(json["mbb"]["vin"], "538SD9Z37GCG06073");
        assert_eq!(json["model"]["model"], "DSR");
        assert_eq!(json["model"]["year"], 2016);
        assert!(json.get("bms").is_none());

        let header = HeaderParser::parse(&lines(BMS_HEADER)).unwrap();
        let json = serde_json::to_value(header.to_record()).unwrap();
        assert_eq!(json["bms"]["initial_date"], "2018-05-13 10:06:43");
        assert!(json.get("model").is_none());
    }
}
