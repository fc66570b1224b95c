//! Cross-log merging
//!
//! Combines a primary log (usually the MBB) with secondary logs (BMS exports,
//! keyed by a caller-chosen name) into one chronological view.
//!
//! Ordering is by timestamp ascending and stable, so entries with equal
//! timestamps keep their input order (primary first, then secondaries in key
//! order). Entries without a timestamp sort after every timestamped entry and
//! are never returned by [`MultiLogMerger::entry_for_timestamp`].

use crate::dataset::{
    condition_keys, delimited_line, entry_row, EntryRecord, LogDataset, OutputFormat, Rendered,
    FIXED_COLUMNS,
};
use crate::types::{LogEntry, Result, Timestamp};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Leading column of merged renderings
pub const SOURCE_COLUMN: &str = "source";

/// An entry of the merged view, tagged with its secondary source key
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEntry {
    /// `None` for primary entries
    pub source: Option<String>,
    pub entry: LogEntry,
}

#[derive(Serialize)]
struct MergedRecord<'a> {
    source: Option<&'a str>,
    #[serde(flatten)]
    entry: EntryRecord<'a>,
}

fn compare_timestamps(a: Option<Timestamp>, b: Option<Timestamp>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Merged chronological view over several logs
#[derive(Debug)]
pub struct MultiLogMerger {
    primary: LogDataset,
    secondaries: BTreeMap<String, LogDataset>,
    merged: Vec<MergedEntry>,
}

impl MultiLogMerger {
    /// Build the merged view of `primary` and `secondaries`
    pub fn new(primary: LogDataset, secondaries: BTreeMap<String, LogDataset>) -> Self {
        let mut merger = Self {
            primary,
            secondaries,
            merged: Vec::new(),
        };
        merger.rebuild();
        merger
    }

    /// Rebuild the merged view from the current dataset entries
    ///
    /// With `deep`, every dataset re-decodes its lines first.
    pub fn refresh(&mut self, deep: bool) -> Result<()> {
        if deep {
            self.primary.refresh()?;
            for dataset in self.secondaries.values_mut() {
                dataset.refresh()?;
            }
        }
        self.rebuild();
        Ok(())
    }

    fn rebuild(&mut self) {
        let primary = self.primary.entries().iter().map(|entry| MergedEntry {
            source: None,
            entry: entry.clone(),
        });
        let secondaries = self.secondaries.iter().flat_map(|(key, dataset)| {
            dataset.entries().iter().map(move |entry| MergedEntry {
                source: Some(key.clone()),
                entry: entry.clone(),
            })
        });

        let mut merged: Vec<MergedEntry> = primary.chain(secondaries).collect();
        merged.sort_by(|a, b| compare_timestamps(a.entry.timestamp, b.entry.timestamp));

        log::debug!(
            "Merged {} entries from {} logs",
            merged.len(),
            self.secondaries.len() + 1
        );
        self.merged = merged;
    }

    pub fn primary(&self) -> &LogDataset {
        &self.primary
    }

    pub fn secondaries(&self) -> &BTreeMap<String, LogDataset> {
        &self.secondaries
    }

    /// The merged view, as of the last refresh
    pub fn entries(&self) -> &[MergedEntry] {
        &self.merged
    }

    /// Lines skipped across every merged log
    pub fn skipped_lines(&self) -> usize {
        self.primary.errors().len()
            + self
                .secondaries
                .values()
                .map(|dataset| dataset.errors().len())
                .sum::<usize>()
    }

    /// Latest entry whose timestamp is at or before `timestamp`
    ///
    /// Returns `None` if `timestamp` precedes every timestamped entry.
    pub fn entry_for_timestamp(&self, timestamp: Timestamp) -> Option<&MergedEntry> {
        let timed = self.merged.partition_point(|m| m.entry.timestamp.is_some());
        let timed = &self.merged[..timed];
        let after = timed.partition_point(|m| m.entry.timestamp.is_some_and(|t| t <= timestamp));
        after.checked_sub(1).map(|idx| &timed[idx])
    }

    /// Condition keys of the primary log, then of each secondary, first-seen order
    pub fn all_condition_keys(&self) -> Vec<&str> {
        condition_keys(
            self.primary
                .entries()
                .iter()
                .chain(self.secondaries.values().flat_map(|d| d.entries())),
        )
    }

    /// Render the merged view
    ///
    /// Same layout as [`LogDataset::render`] with a leading `source` column
    /// (empty for primary entries).
    pub fn render(&self, format: OutputFormat, omit_units: bool) -> Result<Rendered> {
        let Some(delimiter) = format.delimiter() else {
            return self.to_json(omit_units).map(Rendered::Json);
        };

        let keys = self.all_condition_keys();
        let mut lines = Vec::with_capacity(self.merged.len() + 1);
        lines.push(delimited_line(
            std::iter::once(SOURCE_COLUMN)
                .chain(FIXED_COLUMNS.iter().copied())
                .chain(keys.iter().copied()),
            delimiter,
        )?);
        for merged in &self.merged {
            let source = merged.source.clone().unwrap_or_default();
            lines.push(delimited_line(
                std::iter::once(source).chain(entry_row(&merged.entry, &keys, omit_units)),
                delimiter,
            )?);
        }
        Ok(Rendered::Lines(lines))
    }

    /// JSON record tree: `{header, secondary_headers, entries}`
    pub fn to_json(&self, omit_units: bool) -> Result<serde_json::Value> {
        let secondary_headers = self
            .secondaries
            .iter()
            .map(|(key, dataset)| -> Result<(String, serde_json::Value)> {
                Ok((key.clone(), serde_json::to_value(dataset.header().to_record())?))
            })
            .collect::<Result<serde_json::Map<String, serde_json::Value>>>()?;
        let entries: Vec<MergedRecord<'_>> = self
            .merged
            .iter()
            .map(|merged| MergedRecord {
                source: merged.source.as_deref(),
                entry: EntryRecord::new(&merged.entry, omit_units),
            })
            .collect();

        Ok(serde_json::json!({
            "header": serde_json::to_value(self.primary.header().to_record())?,
            "secondary_headers": secondary_headers,
            "entries": serde_json::to_value(entries)?,
        }))
    }
}
