//! Reading source: paces sensor captures and publishes the results.
//!
//! The capture itself runs with the shared lock released; only the
//! write-back of the result takes the lock.

use crate::config::SystemConfig;
use crate::control::SharedState;
use crate::error::DecodeError;
use crate::sensors::Reading;

use super::events::AppEvent;
use super::ports::{EventSink, HumiditySensor};

/// Result of one [`ReadingSource::poll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PollOutcome {
    /// A new reading was stored and flagged fresh.
    Fresh(Reading),
    /// The capture failed; the stored reading is unchanged.
    Failed(DecodeError),
    /// Too soon since the previous capture; nothing was attempted.
    Throttled,
}

pub struct ReadingSource<S> {
    sensor: S,
    interval_ms: u64,
    next_due_ms: Option<u64>,
}

impl<S: HumiditySensor> ReadingSource<S> {
    pub fn new(sensor: S, cfg: &SystemConfig) -> Self {
        Self::with_interval(sensor, u64::from(cfg.sensor_read_interval_ms))
    }

    pub fn with_interval(sensor: S, interval_ms: u64) -> Self {
        Self {
            sensor,
            interval_ms,
            next_due_ms: None,
        }
    }

    /// Milliseconds until the next capture is allowed.
    pub fn ms_until_due(&self, now_ms: u64) -> u64 {
        self.next_due_ms
            .map_or(0, |due| due.saturating_sub(now_ms))
    }

    /// Capture once if the read interval has elapsed.
    pub fn poll(
        &mut self,
        now_ms: u64,
        shared: &SharedState,
        sink: &mut impl EventSink,
    ) -> PollOutcome {
        if self.ms_until_due(now_ms) > 0 {
            return PollOutcome::Throttled;
        }
        // Failed attempts are spaced the same way; the part needs the
        // full interval to recover either way.
        self.next_due_ms = Some(now_ms + self.interval_ms);

        match self.sensor.read() {
            Ok(reading) => {
                shared.with(|s| s.record_reading(reading, now_ms));
                sink.emit(&AppEvent::ReadingAccepted {
                    temperature: reading.temperature,
                    humidity: reading.humidity,
                });
                PollOutcome::Fresh(reading)
            }
            Err(error) => {
                let consecutive = shared.with(|s| {
                    s.record_failure();
                    s.consecutive_failures
                });
                sink.emit(&AppEvent::ReadingFailed { error, consecutive });
                PollOutcome::Failed(error)
            }
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Give the sensor back (and with it the data pin).
    pub fn into_sensor(self) -> S {
        self.sensor
    }
}
