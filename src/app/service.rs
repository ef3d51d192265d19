//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns the arbiter and the actuator port. Each
//! [`tick`](ControlService::tick) decides under the shared lock, releases
//! it, drives whatever outputs differ from what was last driven, and then
//! re-takes the lock to record the levels that actually reached the pins.
//!
//! ```text
//!   CommandInbox ──▶ ┌──────────────────────┐ ──▶ EventSink
//!  SharedState ◀──▶  │    ControlService    │
//!                    │  Arbiter · outputs   │ ──▶ ActuatorPort
//!                    └──────────────────────┘
//! ```
//!
//! A failed write is not recorded, so the next tick sees the mismatch and
//! tries again.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use log::{error, info};

use crate::config::SystemConfig;
use crate::control::{Arbiter, ControlState, Evaluation, SharedState};
use crate::error::ActuatorError;

use super::commands::{CommandInbox, CommandSource, CommandToken};
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink};

/// What the alarm output needs this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlarmAction {
    Set(bool),
    /// On, hold, off.
    Pulse,
}

/// Output writes decided under the lock, performed after it is released.
#[derive(Debug, Default, Clone, Copy)]
struct OutputPlan {
    fan: Option<bool>,
    alarm: Option<AlarmAction>,
}

impl OutputPlan {
    fn from_state(s: &ControlState, alarm_hold_ms: u32) -> Self {
        let fan = (s.fan_output != Some(s.fan_running)).then_some(s.fan_running);
        let alarm = if alarm_hold_ms == 0 {
            (s.alarm_output != Some(s.alert_active)).then_some(AlarmAction::Set(s.alert_active))
        } else if s.alert_active && !s.alarm_hold_done {
            Some(AlarmAction::Pulse)
        } else {
            (s.alarm_output != Some(false)).then_some(AlarmAction::Set(false))
        };
        Self { fan, alarm }
    }
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService<A: ActuatorPort, D: DelayNs> {
    arbiter: Arbiter,
    actuators: A,
    /// Blocking wait for the timed alarm pulse.
    delay: D,
    shared: Arc<SharedState>,
    inbox: Arc<CommandInbox>,
    alarm_hold_ms: u32,
    stopped: bool,
}

impl<A: ActuatorPort, D: DelayNs> ControlService<A, D> {
    pub fn new(
        config: &SystemConfig,
        actuators: A,
        delay: D,
        shared: Arc<SharedState>,
        inbox: Arc<CommandInbox>,
    ) -> Self {
        Self {
            arbiter: Arbiter::new(config),
            actuators,
            delay,
            shared,
            inbox,
            alarm_hold_ms: config.alarm_hold_ms,
            stopped: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive both outputs to the safe OFF state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        let result = self.actuators.all_off();
        let mode = self.shared.with(|s| {
            if result.is_ok() {
                s.fan_output = Some(false);
                s.alarm_output = Some(false);
            }
            s.mode
        });
        if let Err(e) = result {
            self.report_fault(e, sink);
        }
        self.stopped = false;
        sink.emit(&AppEvent::Started { mode });
        info!("ControlService started in {}", mode.as_str());
    }

    /// Force both outputs OFF and stop driving them.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) -> Result<(), ActuatorError> {
        self.shared.with(|s| {
            s.fan_running = false;
            s.alert_active = false;
        });
        let result = self.actuators.all_off();
        self.shared.with(|s| {
            if result.is_ok() {
                s.fan_output = Some(false);
                s.alarm_output = Some(false);
            }
        });
        self.stopped = true;
        match result {
            Ok(()) => {
                sink.emit(&AppEvent::Stopped);
                info!("ControlService stopped, outputs off");
                Ok(())
            }
            Err(e) => {
                self.report_fault(e, sink);
                Err(e)
            }
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// One control cycle: pending commands, then the fresh reading (if
    /// any), then output writes. Does nothing once stopped.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> Evaluation {
        if self.stopped {
            return Evaluation::default();
        }
        let mut applied: Vec<(CommandSource, CommandToken), 2> = Vec::new();
        let (eval, plan) = self.shared.with(|s| {
            let mut eval = Evaluation::default();
            for (source, token) in self.inbox.drain() {
                eval = eval.merge(self.arbiter.apply_command(s, source, token));
                let _ = applied.push((source, token));
            }
            eval = eval.merge(self.arbiter.evaluate(s));
            (eval, OutputPlan::from_state(s, self.alarm_hold_ms))
        });

        for (source, token) in applied {
            sink.emit(&AppEvent::CommandApplied { source, token });
        }
        self.report(eval, sink);
        self.drive(plan, sink);
        eval
    }

    /// Apply a single command immediately, bypassing the inbox.
    pub fn handle_command(
        &mut self,
        source: CommandSource,
        token: CommandToken,
        sink: &mut impl EventSink,
    ) -> Evaluation {
        if self.stopped {
            return Evaluation::default();
        }
        let (eval, plan) = self.shared.with(|s| {
            let eval = self.arbiter.apply_command(s, source, token);
            (eval, OutputPlan::from_state(s, self.alarm_hold_ms))
        });
        sink.emit(&AppEvent::CommandApplied { source, token });
        self.report(eval, sink);
        self.drive(plan, sink);
        eval
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    // ── Internal ──────────────────────────────────────────────

    fn report(&self, eval: Evaluation, sink: &mut impl EventSink) {
        if let Some((from, to)) = eval.mode {
            sink.emit(&AppEvent::ModeChanged { from, to });
        }
        if let Some(active) = eval.alert {
            sink.emit(&AppEvent::AlertChanged { active });
        }
    }

    /// Perform the planned writes with the lock released, then record
    /// the ones that succeeded.
    fn drive(&mut self, plan: OutputPlan, sink: &mut impl EventSink) {
        if self.stopped {
            return;
        }

        let mut fan_done = None;
        if let Some(on) = plan.fan {
            match self.actuators.set_fan(on) {
                Ok(()) => {
                    fan_done = Some(on);
                    sink.emit(&AppEvent::FanChanged { on });
                }
                Err(e) => self.report_fault(e, sink),
            }
        }

        let mut alarm_done = None;
        match plan.alarm {
            Some(AlarmAction::Set(on)) => match self.actuators.set_alarm(on) {
                Ok(()) => alarm_done = Some(AlarmAction::Set(on)),
                Err(e) => self.report_fault(e, sink),
            },
            Some(AlarmAction::Pulse) => match self.pulse_alarm() {
                Ok(()) => alarm_done = Some(AlarmAction::Pulse),
                Err(e) => self.report_fault(e, sink),
            },
            None => {}
        }

        if fan_done.is_none() && alarm_done.is_none() {
            return;
        }
        self.shared.with(|s| {
            if let Some(on) = fan_done {
                s.fan_output = Some(on);
            }
            match alarm_done {
                Some(AlarmAction::Set(on)) => s.alarm_output = Some(on),
                Some(AlarmAction::Pulse) => {
                    s.alarm_output = Some(false);
                    s.alarm_hold_done = true;
                }
                None => {}
            }
        });
    }

    fn pulse_alarm(&mut self) -> Result<(), ActuatorError> {
        self.actuators.set_alarm(true)?;
        self.delay.delay_ms(self.alarm_hold_ms);
        self.actuators.set_alarm(false)
    }

    fn report_fault(&self, e: ActuatorError, sink: &mut impl EventSink) {
        error!("Actuator write failed: {}", e);
        let ActuatorError::Unavailable(actuator) = e;
        sink.emit(&AppEvent::ActuatorFault { actuator });
    }
}

impl<A: ActuatorPort, D: DelayNs> Drop for ControlService<A, D> {
    fn drop(&mut self) {
        if !self.stopped && self.actuators.all_off().is_err() {
            error!("ControlService dropped and outputs could not be cleared");
        }
    }
}
