//! Fan / alert / mode arbitration.
//!
//! ```text
//!            FAN {ON, OFF}  ×  ALERT {ACTIVE, INACTIVE}  ×  MODE {AUTO, MANUAL, REMOTE}
//!
//!  fresh reading ──▶ evaluate()       fan rule (AUTO only), alert latch (any mode)
//!  command token ──▶ apply_command()  mode switch, direct fan set
//! ```
//!
//! The arbiter is pure: it mutates a borrowed [`ControlState`] and reports
//! what changed as an [`Evaluation`]. It never touches an actuator; the
//! service drives outputs from the recorded intent after the lock is
//! released.

use crate::app::commands::{CommandSource, CommandToken};
use crate::config::SystemConfig;

use super::state::{ControlState, Mode};

/// Threshold set the arbiter evaluates against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub fan_on_temperature_c: f32,
    pub fan_on_humidity_pct: f32,
    pub fan_hysteresis_c: f32,
    pub fan_hysteresis_pct: f32,
    pub alert_temperature_c: f32,
    pub alert_humidity_pct: f32,
}

impl From<&SystemConfig> for Thresholds {
    fn from(cfg: &SystemConfig) -> Self {
        Self {
            fan_on_temperature_c: cfg.fan_on_temperature_c,
            fan_on_humidity_pct: cfg.fan_on_humidity_pct,
            fan_hysteresis_c: cfg.fan_hysteresis_c,
            fan_hysteresis_pct: cfg.fan_hysteresis_pct,
            alert_temperature_c: cfg.alert_temperature_c,
            alert_humidity_pct: cfg.alert_humidity_pct,
        }
    }
}

/// Transitions produced by one arbiter call. `None` means unchanged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub fan: Option<bool>,
    pub alert: Option<bool>,
    pub mode: Option<(Mode, Mode)>,
}

impl Evaluation {
    pub fn is_empty(&self) -> bool {
        self.fan.is_none() && self.alert.is_none() && self.mode.is_none()
    }

    /// Fold a later evaluation into this one; later transitions win.
    #[must_use]
    pub fn merge(self, later: Self) -> Self {
        let mode = match (self.mode, later.mode) {
            (Some((from, _)), Some((_, to))) if from == to => None,
            (Some((from, _)), Some((_, to))) => Some((from, to)),
            (first, None) => first,
            (None, second) => second,
        };
        Self {
            fan: later.fan.or(self.fan),
            alert: later.alert.or(self.alert),
            mode,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Arbiter {
    thresholds: Thresholds,
}

impl Arbiter {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            thresholds: Thresholds::from(cfg),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// The alert condition.
    pub fn warning(&self, temperature: f32, humidity: f32) -> bool {
        temperature >= self.thresholds.alert_temperature_c
            || humidity >= self.thresholds.alert_humidity_pct
    }

    /// What the automatic rule wants the fan to be, given its current state.
    ///
    /// OFF→ON when either value reaches its threshold. ON→OFF only once
    /// both values are below threshold minus the hysteresis band; with a
    /// zero band that is simply "neither holds".
    pub fn fan_demand(&self, running: bool, temperature: f32, humidity: f32) -> bool {
        let t = &self.thresholds;
        if temperature >= t.fan_on_temperature_c || humidity >= t.fan_on_humidity_pct {
            return true;
        }
        if running {
            let released = temperature < t.fan_on_temperature_c - t.fan_hysteresis_c
                && humidity < t.fan_on_humidity_pct - t.fan_hysteresis_pct;
            return !released;
        }
        false
    }

    /// Consume a fresh reading. Does nothing when no fresh reading is
    /// pending; always clears the fresh flag.
    pub fn evaluate(&self, state: &mut ControlState) -> Evaluation {
        if !state.has_fresh_reading {
            return Evaluation::default();
        }
        state.has_fresh_reading = false;

        let (temperature, humidity) = (state.temperature, state.humidity);
        let mut eval = Evaluation::default();

        if state.mode == Mode::Automatic {
            let want = self.fan_demand(state.fan_running, temperature, humidity);
            if want != state.fan_running {
                state.fan_running = want;
                eval.fan = Some(want);
            }
        }

        let warning = self.warning(temperature, humidity);
        if warning != state.alert_active {
            state.alert_active = warning;
            if warning {
                state.alarm_hold_done = false;
            }
            eval.alert = Some(warning);
        }

        eval
    }

    /// Apply one command token from `source`.
    pub fn apply_command(
        &self,
        state: &mut ControlState,
        source: CommandSource,
        token: CommandToken,
    ) -> Evaluation {
        let prev_mode = state.mode;
        let prev_fan = state.fan_running;
        let override_mode = match source {
            CommandSource::Manual => Mode::Manual,
            CommandSource::Remote => Mode::Remote,
        };

        match token {
            CommandToken::FanOn => {
                state.mode = override_mode;
                state.fan_running = true;
            }
            CommandToken::FanOff => {
                state.mode = override_mode;
                state.fan_running = false;
            }
            CommandToken::SetManual => {
                // Only leaving automatic drops the fan; an override
                // handed between sources keeps its level.
                if state.mode == Mode::Automatic {
                    state.fan_running = false;
                }
                state.mode = override_mode;
            }
            CommandToken::SetAuto => {
                state.mode = Mode::Automatic;
                // Re-run the rule against the last reading on the next cycle.
                if prev_mode != Mode::Automatic && state.has_reading() {
                    state.has_fresh_reading = true;
                }
            }
        }

        Evaluation {
            fan: (state.fan_running != prev_fan).then_some(state.fan_running),
            alert: None,
            mode: (state.mode != prev_mode).then_some((prev_mode, state.mode)),
        }
    }
}
