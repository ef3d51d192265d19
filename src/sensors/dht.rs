//! Bit-banged DHT11/DHT22 driver on a single open-drain GPIO.
//!
//! ## Wire protocol
//!
//! ```text
//!  host          sensor ack        bit 0          bit 1 ...   end
//!  ‾‾‾\_______/‾‾‾\______/‾‾‾‾‾‾\____/‾‾\____/‾‾‾‾‾‾\  ...  \___/‾‾‾
//!     start     rel   80µs   80µs   50µs 27µs 50µs  70µs
//!     ≥18ms
//! ```
//!
//! The host pulls the line low for the start interval, releases it, and
//! the sensor answers with an 80 µs low / 80 µs high acknowledgement
//! followed by 40 bits. Every bit is a 50 µs low preamble and a high pulse
//! whose length carries the value (~27 µs = 0, ~70 µs = 1).
//!
//! Every wait is bounded twice: by elapsed time on the monotonic clock and
//! by a poll counter, so a frozen clock or a stuck line still terminates.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::app::ports::{HumiditySensor, MonotonicClock};
use crate::config::SystemConfig;
use crate::error::DecodeError;

use super::frame::{Frame, FrameBuilder};
use super::{Reading, SensorModel};

/// Upper bound on pin polls per microsecond of edge timeout.
const POLLS_PER_US: u32 = 64;

/// Host-side timing for one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireTiming {
    pub start_signal_ms: u32,
    pub release_us: u32,
    pub edge_timeout_us: u32,
    pub bit_threshold_us: u32,
}

impl WireTiming {
    pub fn from_config(cfg: &SystemConfig) -> Self {
        Self {
            start_signal_ms: cfg.start_signal_ms,
            release_us: cfg.release_us,
            edge_timeout_us: cfg.edge_timeout_us,
            bit_threshold_us: cfg.bit_threshold_us,
        }
    }
}

impl Default for WireTiming {
    fn default() -> Self {
        Self::from_config(&SystemConfig::default())
    }
}

/// The line did not change level within the edge timeout.
struct Stalled;

/// Protocol decoder owning the data pin, a delay provider and a clock.
pub struct DhtSensor<P, D, C> {
    pin: P,
    delay: D,
    clock: C,
    model: SensorModel,
    timing: WireTiming,
}

impl<P, D, C> DhtSensor<P, D, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    C: MonotonicClock,
{
    pub fn new(pin: P, delay: D, clock: C, model: SensorModel, timing: WireTiming) -> Self {
        Self {
            pin,
            delay,
            clock,
            model,
            timing,
        }
    }

    pub fn from_config(pin: P, delay: D, clock: C, cfg: &SystemConfig) -> Self {
        Self::new(pin, delay, clock, cfg.sensor_model, WireTiming::from_config(cfg))
    }

    pub fn model(&self) -> SensorModel {
        self.model
    }

    /// Trigger the sensor, capture one frame and convert it.
    pub fn decode(&mut self) -> Result<Reading, DecodeError> {
        let frame = self.capture()?;
        frame.to_reading(self.model)
    }

    /// Trigger the sensor and sample the 40 raw bits.
    pub fn capture(&mut self) -> Result<Frame, DecodeError> {
        let result = self.capture_inner();
        // Leave the bus released (pulled up) whatever happened.
        let _ = self.pin.set_high();
        result
    }

    /// Hand the peripherals back, e.g. to release the GPIO on shutdown.
    pub fn release(self) -> (P, D, C) {
        (self.pin, self.delay, self.clock)
    }

    fn capture_inner(&mut self) -> Result<Frame, DecodeError> {
        // Start signal.
        self.pin.set_low().map_err(|_| DecodeError::LineFault)?;
        self.delay.delay_ms(self.timing.start_signal_ms);
        self.pin.set_high().map_err(|_| DecodeError::LineFault)?;
        self.delay.delay_us(self.timing.release_us);

        // Acknowledgement: sensor pulls low, then high, then drops into
        // the first bit's preamble.
        for level in [true, false, true] {
            self.wait_while(level)?.map_err(|Stalled| DecodeError::Timeout)?;
        }

        let mut builder = FrameBuilder::new();
        while !builder.is_complete() {
            let stalled = |bits: u8| {
                if bits == 0 {
                    DecodeError::Timeout
                } else {
                    DecodeError::Incomplete { bits }
                }
            };
            self.wait_while(false)?
                .map_err(|Stalled| stalled(builder.bits()))?;
            let high_us = self
                .wait_while(true)?
                .map_err(|Stalled| stalled(builder.bits()))?;
            builder.push(high_us > self.timing.bit_threshold_us);
        }
        builder.finish()
    }

    /// Spin while the line reads `level`; return how long it stayed there.
    ///
    /// The outer `Result` carries GPIO errors, the inner one a stall.
    fn wait_while(&mut self, level: bool) -> Result<Result<u32, Stalled>, DecodeError> {
        let timeout = u64::from(self.timing.edge_timeout_us);
        let max_polls = self.timing.edge_timeout_us.saturating_mul(POLLS_PER_US);
        let start = self.clock.now_us();
        let mut polls: u32 = 0;
        loop {
            let high = self.pin.is_high().map_err(|_| DecodeError::LineFault)?;
            let elapsed = self.clock.now_us().saturating_sub(start);
            if high != level {
                return Ok(Ok(elapsed.min(u64::from(u32::MAX)) as u32));
            }
            polls += 1;
            if elapsed > timeout || polls > max_polls {
                return Ok(Err(Stalled));
            }
        }
    }
}

impl<P, D, C> HumiditySensor for DhtSensor<P, D, C>
where
    P: InputPin + OutputPin,
    D: DelayNs,
    C: MonotonicClock,
{
    fn read(&mut self) -> Result<Reading, DecodeError> {
        self.decode()
    }
}
