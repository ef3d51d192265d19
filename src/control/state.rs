//! The shared control record and its lock.
//!
//! [`ControlState`] is the single point of truth for readings, mode and
//! actuator intent. Every task reaches it through [`SharedState::with`],
//! which keeps each critical section to one closure.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::sensors::Reading;

/// Placeholder for temperature/humidity before the first valid reading.
pub const SENTINEL: f32 = -999.0;

/// Which control authority currently governs the fan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Threshold policy drives the fan.
    Automatic,
    /// Local override (UI switch / buttons).
    Manual,
    /// Override forced by the remote command channel.
    Remote,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "AUTOMATIC",
            Self::Manual => "MANUAL",
            Self::Remote => "REMOTE",
        }
    }

    /// MANUAL and REMOTE both suspend the automatic fan rule.
    pub const fn is_override(self) -> bool {
        !matches!(self, Self::Automatic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    /// Last valid temperature (°C), or [`SENTINEL`].
    pub temperature: f32,
    /// Last valid relative humidity (%), or [`SENTINEL`].
    pub humidity: f32,
    pub mode: Mode,
    /// Desired fan output.
    pub fan_running: bool,
    /// Warning latch.
    pub alert_active: bool,
    /// Set by the reading source, cleared by the arbiter.
    pub has_fresh_reading: bool,

    /// Uptime of the last successful decode.
    pub last_reading_ms: Option<u64>,
    /// Decode failures since the last success.
    pub consecutive_failures: u32,

    /// Level last driven successfully onto the fan relay.
    pub fan_output: Option<bool>,
    /// Level last driven successfully onto the alarm.
    pub alarm_output: Option<bool>,
    /// The timed alarm pulse already ran for the current alert.
    pub alarm_hold_done: bool,
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            temperature: SENTINEL,
            humidity: SENTINEL,
            mode: Mode::Automatic,
            fan_running: false,
            alert_active: false,
            has_fresh_reading: false,
            last_reading_ms: None,
            consecutive_failures: 0,
            fan_output: None,
            alarm_output: None,
            alarm_hold_done: false,
        }
    }

    /// Record a successful decode.
    pub fn record_reading(&mut self, reading: Reading, now_ms: u64) {
        self.temperature = reading.temperature;
        self.humidity = reading.humidity;
        self.has_fresh_reading = true;
        self.last_reading_ms = Some(now_ms);
        self.consecutive_failures = 0;
    }

    /// Record a failed decode; the previous values stay in place.
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// True once at least one reading has been stored.
    pub fn has_reading(&self) -> bool {
        self.last_reading_ms.is_some()
    }

    /// The stored values as a [`Reading`]; `valid` is false until the
    /// first successful decode.
    pub fn last_reading(&self) -> Reading {
        Reading {
            temperature: self.temperature,
            humidity: self.humidity,
            valid: self.has_reading(),
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}

/// [`ControlState`] behind the one lock all tasks share.
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<ControlState>,
}

impl SharedState {
    pub fn new(state: ControlState) -> Self {
        Self {
            inner: Mutex::new(state),
        }
    }

    /// Run `f` with the lock held. A poisoned lock is recovered: the
    /// shutdown path must still be able to drive the actuators off.
    pub fn with<R>(&self, f: impl FnOnce(&mut ControlState) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> ControlState {
        self.with(|s| s.clone())
    }
}
