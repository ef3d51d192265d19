//! Status publisher: a read-only view of [`ControlState`] for observers.
//!
//! [`snapshot`] copies the observable fields under the lock and never
//! fails, including before the first reading (the sentinel values are
//! reported with `valid = false`). [`StatusPublisher`] forwards a snapshot
//! to its sink only when it differs from the last one published.

use serde::{Deserialize, Serialize};

use crate::control::{ControlState, Mode, SharedState};

use super::ports::StatusSink;

/// Observer-facing status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub temperature: f32,
    pub humidity: f32,
    pub fan_on: bool,
    pub mode: Mode,
    pub alert_active: bool,
    /// At least one reading has been decoded since boot.
    pub valid: bool,
    /// The last `stale_after` or more captures failed.
    pub stale: bool,
    pub last_reading_ms: Option<u64>,
}

impl StatusSnapshot {
    pub fn from_state(s: &ControlState, stale_after: u8) -> Self {
        let reading = s.last_reading();
        Self {
            temperature: reading.temperature,
            humidity: reading.humidity,
            fan_on: s.fan_running,
            mode: s.mode,
            alert_active: s.alert_active,
            valid: reading.valid,
            stale: s.consecutive_failures >= u32::from(stale_after),
            last_reading_ms: s.last_reading_ms,
        }
    }
}

/// Pure read of the shared state.
pub fn snapshot(shared: &SharedState, stale_after: u8) -> StatusSnapshot {
    shared.with(|s| StatusSnapshot::from_state(s, stale_after))
}

/// Publishes on change, at most once per call.
pub struct StatusPublisher {
    stale_after: u8,
    last: Option<StatusSnapshot>,
}

impl StatusPublisher {
    pub fn new(stale_after: u8) -> Self {
        Self {
            stale_after,
            last: None,
        }
    }

    /// Take a snapshot and hand it to `sink` if it changed. Returns
    /// whether anything was published.
    pub fn publish(&mut self, shared: &SharedState, sink: &mut impl StatusSink) -> bool {
        let snap = snapshot(shared, self.stale_after);
        if self.last.as_ref() == Some(&snap) {
            return false;
        }
        sink.publish(&snap);
        self.last = Some(snap);
        true
    }

    pub fn last(&self) -> Option<&StatusSnapshot> {
        self.last.as_ref()
    }
}
