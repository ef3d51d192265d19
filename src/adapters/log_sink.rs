//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART / USB-CDC in production, stderr on the host).

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { mode } => {
                info!("START | mode={} | outputs off", mode.as_str());
            }
            AppEvent::ReadingAccepted {
                temperature,
                humidity,
            } => {
                info!(
                    "SENSOR | T={:.1}\u{00b0}C H={:.1}%",
                    temperature, humidity
                );
            }
            AppEvent::ReadingFailed { error, consecutive } => {
                warn!("SENSOR | read failed: {} (x{})", error, consecutive);
            }
            AppEvent::CommandApplied { source, token } => {
                info!("CMD | {} <- {}", token, source.as_str());
            }
            AppEvent::ModeChanged { from, to } => {
                info!("STATE | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::FanChanged { on } => {
                info!("FAN | {}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::AlertChanged { active } => {
                if *active {
                    warn!("ALERT | warning threshold reached");
                } else {
                    info!("ALERT | cleared");
                }
            }
            AppEvent::ActuatorFault { actuator } => {
                error!("FAULT | {} write failed, retrying next cycle", actuator);
            }
            AppEvent::Stopped => {
                info!("STOP | outputs off");
            }
        }
    }
}
