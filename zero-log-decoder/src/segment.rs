//! Activity segmentation
//!
//! A forward pass over decoded entries grouping them into segments of one
//! operating state. Transitions are driven by the primary contactor entries
//! of the battery and by the first RIDING or CHARGING entry of a run.

use crate::rules::{CONTACTOR_CLOSING_MESSAGE, CONTACTOR_OPENING_MESSAGE};
use crate::types::{EventType, LogEntry, SegmentActivity};

/// Module number of the battery holding the primary contactor
const PRIMARY_MODULE: u32 = 0;

/// Segment state carried from one entry to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentState {
    pub segment_id: u32,
    pub activity: SegmentActivity,
}

impl SegmentState {
    fn enter(self, activity: SegmentActivity) -> Self {
        Self {
            segment_id: self.segment_id + 1,
            activity,
        }
    }
}

fn is_primary_contactor(entry: &LogEntry, message: &str) -> bool {
    entry.is_battery_event()
        && entry.event == message
        && entry.battery_module_no() == Some(PRIMARY_MODULE)
}

/// Compute the state after `entry`
///
/// Returns the new state and whether `entry` opened a new segment. Only the
/// first matching trigger fires: contactor closing, contactor opening, then
/// entering RIDING, then entering CHARGING.
pub fn transition(state: SegmentState, entry: &LogEntry) -> (SegmentState, bool) {
    let next = if is_primary_contactor(entry, CONTACTOR_CLOSING_MESSAGE) {
        Some(SegmentActivity::Started)
    } else if is_primary_contactor(entry, CONTACTOR_OPENING_MESSAGE) {
        Some(SegmentActivity::Stopped)
    } else if entry.event_type == Some(EventType::Riding)
        && state.activity != SegmentActivity::Riding
    {
        Some(SegmentActivity::Riding)
    } else if entry.event_type == Some(EventType::Charging)
        && state.activity != SegmentActivity::Charging
    {
        Some(SegmentActivity::Charging)
    } else {
        None
    };

    match next {
        Some(activity) => (state.enter(activity), true),
        None => (state, false),
    }
}

/// Stamps segment id and activity onto a sequence of entries
#[derive(Debug, Default)]
pub struct SegmentAnnotator {
    state: SegmentState,
}

impl SegmentAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state (the state of the last annotated entry)
    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Advance over one entry and stamp it
    pub fn annotate_entry(&mut self, entry: &mut LogEntry) -> bool {
        let (state, started) = transition(self.state, entry);
        if started {
            log::debug!(
                "Entry {}: segment {} {}",
                entry.sequence_number,
                state.segment_id,
                state.activity
            );
        }
        self.state = state;
        entry.segment_id = state.segment_id;
        entry.segment_activity = state.activity;
        started
    }

    /// Annotate a whole log, in order, from the initial state
    ///
    /// Returns the number of segments opened.
    pub fn annotate(entries: &mut [LogEntry]) -> u32 {
        let mut annotator = Self::new();
        for entry in entries.iter_mut() {
            annotator.annotate_entry(entry);
        }
        annotator.state().segment_id
    }
}
