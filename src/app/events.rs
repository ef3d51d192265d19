//! Outbound application events.
//!
//! The control core emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them (serial log, display, telemetry).

use crate::control::Mode;
use crate::error::{Actuator, DecodeError};

use super::commands::{CommandSource, CommandToken};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The control service started; outputs were driven off.
    Started { mode: Mode },

    /// A sensor frame decoded successfully.
    ReadingAccepted { temperature: f32, humidity: f32 },

    /// A sensor frame failed; the previous reading is retained.
    ReadingFailed {
        error: DecodeError,
        consecutive: u32,
    },

    /// A command token was applied.
    CommandApplied {
        source: CommandSource,
        token: CommandToken,
    },

    /// The control mode changed.
    ModeChanged { from: Mode, to: Mode },

    /// The fan output was driven to a new level.
    FanChanged { on: bool },

    /// The alert latch changed.
    AlertChanged { active: bool },

    /// An actuator write failed; it will be retried next cycle.
    ActuatorFault { actuator: Actuator },

    /// The control service shut down with all outputs off.
    Stopped,
}
