//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService / ReadingSource (domain)
//! ```
//!
//! Driven adapters (sensor, relays, event and status sinks, storage, the
//! command link) implement these traits. The domain core consumes them via
//! generics, so it never touches hardware directly and every test can swap
//! in a recording double.

use crate::config::SystemConfig;
use crate::error::{ActuatorError, ConfigError, DecodeError};
use crate::sensors::Reading;

use super::events::AppEvent;
use super::status::StatusSnapshot;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: one blocking frame capture per call.
pub trait HumiditySensor {
    /// Capture and decode one frame. Failures are transient; the caller
    /// retries on its next poll.
    fn read(&mut self) -> Result<Reading, DecodeError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: binary fan relay and alarm outputs.
pub trait ActuatorPort {
    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_alarm(&mut self, on: bool) -> Result<(), ActuatorError>;

    /// Drive both outputs OFF. Both writes are attempted even if the
    /// first fails; the first error is returned.
    fn all_off(&mut self) -> Result<(), ActuatorError> {
        let fan = self.set_fan(false);
        let alarm = self.set_alarm(false);
        fan.and(alarm)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Status sink port (driven adapter: domain → display / dashboard)
// ───────────────────────────────────────────────────────────────

/// Receives a [`StatusSnapshot`] whenever the published status changes.
pub trait StatusSink {
    fn publish(&mut self, snapshot: &StatusSnapshot);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source. Microsecond resolution is required by the
/// sensor decoder; everything else works in milliseconds.
pub trait MonotonicClock {
    fn now_us(&self) -> u64;

    fn now_ms(&self) -> u64 {
        self.now_us() / 1000
    }
}

// ───────────────────────────────────────────────────────────────
// Command transport port (driving adapter: outside world → domain)
// ───────────────────────────────────────────────────────────────

/// Non-blocking byte source for remote command tokens.
pub trait CommandTransport {
    /// Copy whatever bytes are pending into `buf` and return how many.
    /// Returns 0 when nothing is waiting; that is not an error.
    fn poll_read(&mut self, buf: &mut [u8]) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Persistent home of the [`SystemConfig`].
///
/// `save` runs [`SystemConfig::validate`] first and refuses out-of-range
/// values; a stored config that fails validation on `load` is reported
/// the same way. Nothing is ever clamped into range.
pub trait ConfigPort {
    /// The stored config, or the defaults when nothing has been saved yet.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}
