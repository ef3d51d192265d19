//! Humidity/temperature sensing for the single-wire DHT family.
//!
//! [`frame`] holds the pure 40-bit frame logic (bit packing, checksum,
//! unit conversion); [`dht`] bit-bangs the data line through
//! `embedded-hal` traits so the same decoder runs against real GPIO and
//! against the simulated wire in the integration tests.

pub mod dht;
pub mod frame;

use core::fmt;
use core::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// One successful sensor measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Degrees Celsius.
    pub temperature: f32,
    /// Relative humidity, percent.
    pub humidity: f32,
    pub valid: bool,
}

impl Reading {
    pub const fn new(temperature: f32, humidity: f32) -> Self {
        Self {
            temperature,
            humidity,
            valid: true,
        }
    }
}

/// Supported members of the single-wire humidity/temperature family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorModel {
    /// Integer humidity and temperature bytes, 1 Hz max.
    Dht11,
    /// 16-bit tenths with a sign bit, 0.5 Hz max.
    Dht22,
}

impl SensorModel {
    /// Shortest spacing between two reads the part tolerates.
    pub const fn min_read_interval_ms(self) -> u32 {
        match self {
            Self::Dht11 => 1000,
            Self::Dht22 => 2000,
        }
    }

    /// Shortest host start pulse the part recognises.
    pub const fn min_start_signal_ms(self) -> u32 {
        match self {
            Self::Dht11 => 18,
            Self::Dht22 => 1,
        }
    }

    /// Temperatures the part can physically report (°C).
    pub fn temperature_range(self) -> RangeInclusive<f32> {
        match self {
            Self::Dht11 => -20.0..=60.0,
            Self::Dht22 => -40.0..=80.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dht11 => "DHT11",
            Self::Dht22 => "DHT22",
        }
    }
}

impl fmt::Display for SensorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
