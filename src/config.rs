//! System configuration parameters
//!
//! All tunable parameters for the SmartVent controller. The defaults
//! reproduce the stock wiring: a DHT11 on the data pin, fan on at
//! 28 °C or 70 %RH, alarm latched on the same condition.
//! Values can be overridden via NVS (see [`crate::adapters::nvs`]).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::SensorModel;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Sensor wire protocol ---
    /// Which member of the single-wire family is fitted.
    pub sensor_model: SensorModel,
    /// How long the host holds the data line low to request a frame (ms).
    pub start_signal_ms: u32,
    /// How long the host drives the line high after the start pulse (µs).
    pub release_us: u32,
    /// Longest tolerated wait for any single level transition (µs).
    pub edge_timeout_us: u32,
    /// High pulses longer than this decode as `1` (µs).
    pub bit_threshold_us: u32,

    // --- Fan policy (automatic mode) ---
    /// Fan turns on at or above this temperature (°C).
    pub fan_on_temperature_c: f32,
    /// Fan turns on at or above this relative humidity (%).
    pub fan_on_humidity_pct: f32,
    /// Release band below `fan_on_temperature_c`; 0 = single threshold.
    pub fan_hysteresis_c: f32,
    /// Release band below `fan_on_humidity_pct`; 0 = single threshold.
    pub fan_hysteresis_pct: f32,

    // --- Alert ---
    /// Warning condition: temperature at or above this (°C).
    pub alert_temperature_c: f32,
    /// Warning condition: humidity at or above this (%).
    pub alert_humidity_pct: f32,
    /// Sound the alarm for this long then silence it (ms); 0 = hold
    /// until the warning clears.
    pub alarm_hold_ms: u32,

    // --- Outputs ---
    /// Relay board energises on a LOW input.
    pub fan_relay_active_low: bool,

    // --- Timing ---
    /// Sensor read interval (milliseconds)
    pub sensor_read_interval_ms: u32,
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u32,
    /// Command transport poll interval (milliseconds)
    pub command_poll_interval_ms: u32,
    /// Consecutive decode failures before the status is flagged stale.
    pub stale_after_failures: u8,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Sensor
            sensor_model: SensorModel::Dht11,
            start_signal_ms: 18,
            release_us: 30,
            edge_timeout_us: 100,
            bit_threshold_us: 40,

            // Fan
            fan_on_temperature_c: 28.0,
            fan_on_humidity_pct: 70.0,
            fan_hysteresis_c: 0.0,
            fan_hysteresis_pct: 0.0,

            // Alert
            alert_temperature_c: 28.0,
            alert_humidity_pct: 70.0,
            alarm_hold_ms: 0,

            // Outputs
            fan_relay_active_low: false,

            // Timing
            sensor_read_interval_ms: 2000, // 0.5 Hz
            control_loop_interval_ms: 100, // 10 Hz
            command_poll_interval_ms: 50,
            stale_after_failures: 3,
        }
    }
}

impl SystemConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = self.sensor_model;
        if self.start_signal_ms < model.min_start_signal_ms() || self.start_signal_ms > 30 {
            return Err(ConfigError::ValidationFailed(
                "start_signal_ms below sensor minimum or above 30",
            ));
        }
        if !(10..=80).contains(&self.release_us) {
            return Err(ConfigError::ValidationFailed("release_us must be 10–80"));
        }
        if !(50..=1000).contains(&self.edge_timeout_us) {
            return Err(ConfigError::ValidationFailed(
                "edge_timeout_us must be 50–1000",
            ));
        }
        if !(20..=65).contains(&self.bit_threshold_us) || self.bit_threshold_us >= self.edge_timeout_us
        {
            return Err(ConfigError::ValidationFailed(
                "bit_threshold_us must be 20–65 and below edge_timeout_us",
            ));
        }

        check_temperature(self.fan_on_temperature_c, "fan_on_temperature_c must be -40–80")?;
        check_humidity(self.fan_on_humidity_pct, "fan_on_humidity_pct must be 0–100")?;
        if !(0.0..=20.0).contains(&self.fan_hysteresis_c) {
            return Err(ConfigError::ValidationFailed(
                "fan_hysteresis_c must be 0–20",
            ));
        }
        if !(0.0..=50.0).contains(&self.fan_hysteresis_pct) {
            return Err(ConfigError::ValidationFailed(
                "fan_hysteresis_pct must be 0–50",
            ));
        }

        check_temperature(self.alert_temperature_c, "alert_temperature_c must be -40–80")?;
        check_humidity(self.alert_humidity_pct, "alert_humidity_pct must be 0–100")?;
        if self.alarm_hold_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "alarm_hold_ms must be 0–10000",
            ));
        }

        if self.sensor_read_interval_ms < model.min_read_interval_ms()
            || self.sensor_read_interval_ms > 600_000
        {
            return Err(ConfigError::ValidationFailed(
                "sensor_read_interval_ms below sensor minimum or above 600000",
            ));
        }
        if !(10..=5000).contains(&self.control_loop_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be 10–5000",
            ));
        }
        if !(10..=1000).contains(&self.command_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "command_poll_interval_ms must be 10–1000",
            ));
        }
        if self.stale_after_failures == 0 {
            return Err(ConfigError::ValidationFailed(
                "stale_after_failures must be at least 1",
            ));
        }
        Ok(())
    }
}

fn check_temperature(value: f32, msg: &'static str) -> Result<(), ConfigError> {
    if (-40.0..=80.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(msg))
    }
}

fn check_humidity(value: f32, msg: &'static str) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(msg))
    }
}
