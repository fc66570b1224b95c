//! Entry Decoding Engine
//!
//! Turns one entry line of a Zero log into a [`LogEntry`]: fixed-width entry
//! number and timestamp, then the message text, which is split into level,
//! event type, component, prose, and a conditions payload using the rule
//! tables in [`crate::rules`].

use crate::conditions::{parse_conditions, split_payload};
use crate::config::{DecoderConfig, EntryColumns};
use crate::rules::{
    self, CHARGING_MARKER, COMPONENT_RULES, DEFAULT_COMPONENT, ERROR_MARKER,
    FROM_CHARGING_MARKER, LEVEL_PREFIXES, LIMIT_MARKER, MODULE_PREFIX, TURNING_PREFIX,
    TYPE_PREFIX_RULES, TYPE_SUFFIX_RULES,
};
use crate::types::{
    Conditions, DecoderError, EventLevel, EventType, LogEntry, Result, SegmentActivity,
    Timestamp,
};
use regex::Regex;
use std::sync::LazyLock;

/// `Module <number>` at the start of a battery message
static MODULE_NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Module\s+(\d+)\b\s*").unwrap());

/// Everything decoded from the message part of an entry line
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub event_level: Option<EventLevel>,
    pub event_type: Option<EventType>,
    pub component: String,
    pub event: String,
    pub conditions: Conditions,
}

/// Entry decoder - extracts entries from log lines
pub struct EntryDecoder<'a> {
    config: &'a DecoderConfig,
    columns: EntryColumns,
}

impl<'a> EntryDecoder<'a> {
    /// Create a decoder for lines laid out as `columns`
    pub fn new(config: &'a DecoderConfig, columns: EntryColumns) -> Self {
        Self { config, columns }
    }

    /// Decode one entry line
    ///
    /// # Arguments
    /// * `index` - Position of the line in the whole log (for error reports)
    /// * `line` - Raw line text
    ///
    /// # Returns
    /// * `Ok(LogEntry)` with segment fields at their defaults
    /// * `Err(DecoderError::LineDecode)` if the line is too short or has no entry number
    pub fn decode_line(&self, index: usize, line: &str) -> Result<LogEntry> {
        let line_error = |reason: String| DecoderError::LineDecode {
            index,
            content: line.to_string(),
            reason,
        };

        let length = line.trim_end().chars().count();
        if length < self.columns.timestamp.start {
            return Err(line_error(format!(
                "line has {} characters, expected at least {}",
                length, self.columns.timestamp.start
            )));
        }

        let sequence_text = column(line, self.columns.sequence.start, Some(self.columns.sequence.end)).trim();
        let sequence_number: u32 = sequence_text
            .parse()
            .map_err(|_| line_error(format!("invalid entry number {:?}", sequence_text)))?;

        let timestamp_text =
            column(line, self.columns.timestamp.start, Some(self.columns.timestamp.end)).trim();
        let timestamp = self.parse_timestamp(timestamp_text);
        if timestamp.is_none() && !timestamp_text.is_empty() {
            log::debug!(
                "Line #{}: unparseable timestamp {:?}, keeping entry without time",
                index,
                timestamp_text
            );
        }

        let message = column(line, self.columns.message_start, None).trim();
        let decoded = Self::decode_message(message);

        log::trace!(
            "Line #{}: entry {} {:?} {:?} {:?}",
            index,
            sequence_number,
            decoded.component,
            decoded.event_type,
            decoded.event
        );

        Ok(LogEntry {
            sequence_number,
            timestamp,
            component: decoded.component,
            event_type: decoded.event_type,
            event_level: decoded.event_level,
            event: decoded.event,
            conditions: decoded.conditions,
            segment_id: 0,
            segment_activity: SegmentActivity::default(),
        })
    }

    /// Parse a timestamp with the configured formats, `None` if none fits
    pub fn parse_timestamp(&self, text: &str) -> Option<Timestamp> {
        if text.is_empty() {
            return None;
        }
        self.config
            .timestamp_formats
            .iter()
            .find_map(|format| Timestamp::parse_from_str(text, format).ok())
    }

    /// Decode the message text of an entry
    ///
    /// Level and type are read from the full message; the type may clear the
    /// text (hex payloads); then the component is inferred, the battery module
    /// number and the conditions payload are split off, and known special
    /// messages are normalized.
    pub fn decode_message(message: &str) -> DecodedMessage {
        let (event_level, text) = Self::decode_level(message);

        let event_type = Self::decode_type(text);
        let text = if event_type == Some(EventType::Unknown) {
            ""
        } else {
            text
        };

        let component = Self::decode_component(text).to_string();
        let mut conditions = Conditions::new();

        // Module number becomes the first condition
        let text = match MODULE_NUMBER_REGEX.captures(text) {
            Some(caps) => {
                conditions.insert("Module", &caps[1]);
                let rest = &text[caps.get(0).map_or(text.len(), |m| m.end())..];
                format!("{}{}", MODULE_PREFIX, rest).trim_end().to_string()
            }
            None => text.to_string(),
        };

        let (prose, payload) = split_payload(&text);
        let mut event = prose.to_string();
        if let Some(payload) = payload {
            conditions.extend(parse_conditions(payload));
        }

        if let Some((message, values)) = rules::match_special_message(&event) {
            event = message.to_string();
            for (key, value) in values {
                conditions.insert(key, value);
            }
        } else if let Some((message, values)) = rules::match_listed_message(&event) {
            event = message.to_string();
            for (key, value) in values {
                conditions.insert(key, value);
            }
        }

        DecodedMessage {
            event_level,
            event_type,
            component,
            event,
            conditions,
        }
    }

    /// Split off a level prefix
    ///
    /// Without a prefix, messages containing ` error` are still errors.
    pub fn decode_level(message: &str) -> (Option<EventLevel>, &str) {
        match rules::match_prefix(LEVEL_PREFIXES, message) {
            Some((prefix, level)) => (Some(level), message[prefix.len()..].trim_start()),
            None if message.contains(ERROR_MARKER) => (Some(EventLevel::Error), message),
            None => (None, message),
        }
    }

    /// Infer the event type
    ///
    /// Prefix rules first, then suffix rules (which override), then the
    /// special cases in increasing priority: `Turning on/off`, charging, limit.
    pub fn decode_type(text: &str) -> Option<EventType> {
        let mut event_type = rules::match_prefix(TYPE_PREFIX_RULES, text).map(|(_, t)| t);

        if let Some((_, suffix_type)) = rules::match_suffix(TYPE_SUFFIX_RULES, text) {
            event_type = Some(suffix_type);
        }

        if text.starts_with(TURNING_PREFIX) {
            let switched = text.split_whitespace().find_map(|token| {
                if token.eq_ignore_ascii_case("on") {
                    Some(EventType::On)
                } else if token.eq_ignore_ascii_case("off") {
                    Some(EventType::Off)
                } else {
                    None
                }
            });
            if switched.is_some() {
                event_type = switched;
            }
        }

        if text.contains(CHARGING_MARKER) && !text.contains(FROM_CHARGING_MARKER) {
            event_type = Some(EventType::Charging);
        }

        if text.to_ascii_uppercase().contains(LIMIT_MARKER) {
            event_type = Some(EventType::Limit);
        }

        event_type
    }

    /// Infer the emitting component
    pub fn decode_component(text: &str) -> &'static str {
        if text.starts_with(MODULE_PREFIX) {
            return rules::BATTERY_COMPONENT;
        }
        rules::match_substring(COMPONENT_RULES, text)
            .map(|(_, component)| component)
            .unwrap_or(DEFAULT_COMPONENT)
    }
}

/// Character-indexed slice `[start, end)` of a line, clamped to its length
fn column(line: &str, start: usize, end: Option<usize>) -> &str {
    let byte_at = |char_idx: usize| {
        line.char_indices()
            .nth(char_idx)
            .map_or(line.len(), |(byte_idx, _)| byte_idx)
    };
    let from = byte_at(start);
    let to = end.map_or(line.len(), byte_at).max(from);
    &line[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(line: &str) -> LogEntry {
        let config = DecoderConfig::new();
        let columns = config.entry_columns(&[0, 9, 32, 59]);
        EntryDecoder::new(&config, columns)
            .decode_line(0, line)
            .unwrap()
    }

    #[test]
    fn test_disarmed_with_conditions() {
        let entry = decode(
            " 00001     05/21/2018 21:12:20   Disarmed                    PackTemp: h 21C, l 20C, \
             PackSOC: 91%, Vpack:113.044V, MotAmps:   0, BattAmps:   2, Mods: 11,  MotTemp:  26C, \
             CtrlTemp:  19C, AmbTemp:  20C, MotRPM:   0, Odo:48809km",
        );

        assert_eq!(entry.sequence_number, 1);
        assert_eq!(
            entry.timestamp.map(|t| t.to_string()),
            Some("2018-05-21 21:12:20".to_string())
        );
        assert_eq!(entry.event_type, None);
        assert_eq!(entry.event_level, None);
        assert_eq!(entry.component, "MBB");
        assert_eq!(entry.event, "Disarmed");
        assert_eq!(entry.conditions.len(), 12);
        assert_eq!(entry.conditions.get("PackTemp (h)"), Some("21C"));
        assert_eq!(entry.conditions.get("Vpack"), Some("113.044V"));
        assert_eq!(entry.conditions.get("Odo"), Some("48809km"));
    }

    #[test]
    fn test_info_only_data() {
        let entry = decode(
            " 07558     05/20/2018 16:36:56   INFO:  Bmvolts: 92062, Cmvolts: 118937, Amps: 0, RPM: 0    ",
        );

        assert_eq!(entry.sequence_number, 7558);
        assert_eq!(entry.event_level, Some(EventLevel::Info));
        assert_eq!(entry.event, "");
        let keys: Vec<&str> = entry.conditions.keys().collect();
        assert_eq!(keys, vec!["Bmvolts", "Cmvolts", "Amps", "RPM"]);
    }

    #[test]
    fn test_module_message_without_number() {
        let entry =
            decode(" 07544     05/20/2018 16:36:52   DEBUG: Module mode Change Requires Disconnect    ");

        assert_eq!(entry.event_level, Some(EventLevel::Debug));
        assert_eq!(entry.component, "Battery");
        assert_eq!(entry.event, "Module mode Change Requires Disconnect");
        assert!(entry.conditions.is_empty());
    }

    #[test]
    fn test_current_limited() {
        let entry = decode(
            " 07396     05/20/2018 16:15:31    Batt Dischg Cur Limited    281 A (40.72463768115942%), \
             MinCell: 3383mV, MaxPackTemp: 34C",
        );

        assert_eq!(entry.event_type, Some(EventType::Limit));
        assert_eq!(entry.event, "Batt Dischg Cur Limited");
        let expected: Conditions = [
            ("MinCell", "3383mV"),
            ("MaxPackTemp", "34C"),
            ("BattAmps", "281"),
            ("PackSOC", "40.72463768115942%"),
        ]
        .into_iter()
        .collect();
        assert_eq!(entry.conditions, expected);
    }

    #[test]
    fn test_error_entry_with_module_number() {
        let entry = decode(
            " 07758     05/20/2018 16:52:01   ERROR: Module 01 maximum connection retries reached. Flagging ineligble.    ",
        );

        assert_eq!(entry.event_level, Some(EventLevel::Error));
        assert!(entry.has_log_level());
        assert_eq!(entry.component, "Battery");
        assert!(entry.is_battery_event());
        assert_eq!(
            entry.event,
            "Module maximum connection retries reached. Flagging ineligble."
        );
        assert_eq!(entry.conditions.get("Module"), Some("01"));
        assert_eq!(entry.battery_module_no(), Some(1));
    }

    #[test]
    fn test_module_not_connected() {
        let entry = decode(
            " 01525     05/14/2018 16:49:14   Module 1 not connected, PV 109511mV, diff 0mV, \
             Allowed diff 750mV, pack cap 26Ah, batt curr 0A, PackTemp h 23C, l 23C, \
             last CAN msg 4ms ago, lcell 3903mV, Max charge 10cx10, max discharge 100cx10",
        );

        assert_eq!(entry.sequence_number, 1525);
        assert_eq!(entry.component, "Battery");
        assert_eq!(entry.event, "Module not connected");
        assert!(!entry.has_log_level());
        let expected: Conditions = [
            ("Module", "1"),
            ("PV", "109511mV"),
            ("diff", "0mV"),
            ("Allowed diff", "750mV"),
            ("pack cap", "26Ah"),
            ("batt curr", "0A"),
            ("PackTemp h", "23C"),
            ("l", "23C"),
            ("lcell", "3903mV"),
            ("Max charge", "10cx10"),
            ("max discharge", "100cx10"),
        ]
        .into_iter()
        .collect();
        assert_eq!(entry.conditions, expected);
        assert_eq!(entry.battery_module_no(), Some(1));
    }

    #[test]
    fn test_contactor_closing() {
        let entry = decode(
            " 00012     05/13/2018 10:06:44   Module 00 Closing Contactor  vmod: 109.514V, maxsys: 109.514V",
        );

        assert_eq!(entry.component, "Battery");
        assert_eq!(entry.event, "Module Closing Contactor");
        let keys: Vec<&str> = entry.conditions.keys().collect();
        assert_eq!(keys, vec!["Module", "vmod", "maxsys"]);
        assert_eq!(entry.battery_module_no(), Some(0));
    }

    #[test]
    fn test_hex_payload_is_cleared() {
        let entry = decode(" 00100     05/13/2018 10:07:00   0x05 0x00 0x12 0xff");
        assert_eq!(entry.event_type, Some(EventType::Unknown));
        assert_eq!(entry.event, "");
        assert!(entry.conditions.is_empty());
    }

    #[test]
    fn test_unparseable_timestamp_keeps_entry() {
        let entry = decode(" 00002     99/99/2018 10:06:43   Disarmed");
        assert_eq!(entry.sequence_number, 2);
        assert_eq!(entry.timestamp, None);
        assert_eq!(entry.event, "Disarmed");

        let entry = decode(" 00003                           Disarmed");
        assert_eq!(entry.timestamp, None);
    }

    #[test]
    fn test_invalid_lines_are_errors() {
        let config = DecoderConfig::new();
        let columns = config.entry_columns(&[0, 9, 32, 59]);
        let decoder = EntryDecoder::new(&config, columns);

        let err = decoder
            .decode_line(14, " abcde     05/13/2018 10:06:43   Disarmed")
            .unwrap_err();
        match err {
            DecoderError::LineDecode { index, content, .. } => {
                assert_eq!(index, 14);
                assert!(content.contains("abcde"));
            }
            other => panic!("unexpected error {:?}", other),
        }

        assert!(matches!(
            decoder.decode_line(15, " 0001"),
            Err(DecoderError::LineDecode { .. })
        ));
    }

    #[test]
    fn test_level_rules() {
        assert_eq!(
            EntryDecoder::decode_level("- DEBUG: Sevcon CAN Link Up"),
            (Some(EventLevel::Debug), "Sevcon CAN Link Up")
        );
        assert_eq!(
            EntryDecoder::decode_level("WARNING: Low Battery"),
            (Some(EventLevel::Warning), "Low Battery")
        );
        assert_eq!(
            EntryDecoder::decode_level("Charger 6 comm error detected"),
            (Some(EventLevel::Error), "Charger 6 comm error detected")
        );
        assert_eq!(EntryDecoder::decode_level("Disarmed"), (None, "Disarmed"));
    }

    #[test]
    fn test_type_rules_and_overrides() {
        assert_eq!(EntryDecoder::decode_type("Riding"), Some(EventType::Riding));
        assert_eq!(
            EntryDecoder::decode_type("Sevcon CAN Link Down"),
            Some(EventType::Disconnected)
        );
        assert_eq!(
            EntryDecoder::decode_type("Enabling DCDC"),
            Some(EventType::Enabling)
        );
        assert_eq!(
            EntryDecoder::decode_type("Disabling DCDC"),
            Some(EventType::Disabling)
        );
        assert_eq!(
            EntryDecoder::decode_type("Enabling Charger Off"),
            Some(EventType::Off)
        );
        assert_eq!(
            EntryDecoder::decode_type("Turning on Charger 6"),
            Some(EventType::On)
        );
        assert_eq!(
            EntryDecoder::decode_type("Turning off DCDC"),
            Some(EventType::Off)
        );
        assert_eq!(
            EntryDecoder::decode_type("Stop Charging"),
            Some(EventType::Charging)
        );
        assert_eq!(EntryDecoder::decode_type("Exit from Charging"), None);
        assert_eq!(
            EntryDecoder::decode_type("Charging Current LIMIT Reached"),
            Some(EventType::Limit)
        );
        assert_eq!(EntryDecoder::decode_type("Disarmed"), None);
    }

    #[test]
    fn test_component_rules() {
        assert_eq!(EntryDecoder::decode_component("Module 02 Opening"), "Battery");
        assert_eq!(EntryDecoder::decode_component("Sevcon Turned On"), "Controller");
        assert_eq!(EntryDecoder::decode_component("Calex Charger Connected"), "Charger");
        assert_eq!(
            EntryDecoder::decode_component("External Chg Connected"),
            "External Charger"
        );
        assert_eq!(EntryDecoder::decode_component("Disarmed"), "MBB");
    }

    #[test]
    fn test_column_is_char_based_and_clamped() {
        assert_eq!(column("héllo world", 1, Some(5)), "éllo");
        assert_eq!(column("short", 3, Some(40)), "rt");
        assert_eq!(column("short", 10, None), "");
    }
}
