//! 40-bit DHT frame: `[hum_hi, hum_lo, temp_hi, temp_lo, checksum]`.
//!
//! Bits arrive MSB-first. The checksum is the low byte of the sum of the
//! four data bytes. Plausibility is checked only after the checksum, so a
//! corrupted frame always reports `BadChecksum`.

use crate::error::DecodeError;

use super::{Reading, SensorModel};

/// Number of data bits in one frame.
pub const FRAME_BITS: u8 = 40;

/// A complete, not yet validated frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame([u8; 5]);

impl Frame {
    pub const fn from_bytes(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 5] {
        self.0
    }

    /// `(b0 + b1 + b2 + b3) mod 256`.
    pub fn computed_checksum(&self) -> u8 {
        self.0[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    pub fn verify(&self) -> Result<(), DecodeError> {
        let computed = self.computed_checksum();
        let received = self.0[4];
        if computed == received {
            Ok(())
        } else {
            Err(DecodeError::BadChecksum { computed, received })
        }
    }

    /// Validate the checksum, convert to engineering units and reject
    /// values the part cannot produce.
    pub fn to_reading(&self, model: SensorModel) -> Result<Reading, DecodeError> {
        self.verify()?;
        let [b0, b1, b2, b3, _] = self.0;

        let (humidity, temperature) = match model {
            SensorModel::Dht11 => {
                let humidity = f32::from(b0) + f32::from(b1) * 0.1;
                let magnitude = f32::from(b2) + f32::from(b3 & 0x0f) * 0.1;
                let temperature = if b3 & 0x80 != 0 { -magnitude } else { magnitude };
                (humidity, temperature)
            }
            SensorModel::Dht22 => {
                let humidity = f32::from(u16::from_be_bytes([b0, b1])) / 10.0;
                let magnitude = f32::from(u16::from_be_bytes([b2 & 0x7f, b3])) / 10.0;
                let temperature = if b2 & 0x80 != 0 { -magnitude } else { magnitude };
                (humidity, temperature)
            }
        };

        if !(0.0..=100.0).contains(&humidity) || !model.temperature_range().contains(&temperature)
        {
            return Err(DecodeError::Implausible);
        }
        Ok(Reading::new(temperature, humidity))
    }
}

/// Packs sampled bits MSB-first into a [`Frame`].
#[derive(Debug, Default)]
pub struct FrameBuilder {
    bytes: [u8; 5],
    bits: u8,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one bit. Bits past the 40th are ignored.
    pub fn push(&mut self, bit: bool) {
        if self.is_complete() {
            return;
        }
        let idx = usize::from(self.bits / 8);
        self.bytes[idx] <<= 1;
        if bit {
            self.bytes[idx] |= 1;
        }
        self.bits += 1;
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn is_complete(&self) -> bool {
        self.bits >= FRAME_BITS
    }

    pub fn finish(self) -> Result<Frame, DecodeError> {
        if self.is_complete() {
            Ok(Frame(self.bytes))
        } else {
            Err(DecodeError::Incomplete { bits: self.bits })
        }
    }
}
