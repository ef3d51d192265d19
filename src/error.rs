//! Unified error types for the SmartVent firmware.
//!
//! Each subsystem owns a small `Copy` error enum; all of them convert into
//! the top-level [`Error`] so the runtime boundary handles failures uniformly.
//! Decoder failures never leave the reading source, actuator failures are
//! retried on the next control cycle, and initialisation failures are fatal.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The humidity/temperature sensor produced no usable frame.
    Decode(DecodeError),
    /// An actuator could not be driven.
    Actuator(ActuatorError),
    /// Peripheral bring-up failed.
    Init(InitError),
    /// The stored configuration could not be used.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor decode errors
// ---------------------------------------------------------------------------

/// Failure modes of a single-wire frame capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The sensor never acknowledged the start signal, or a level
    /// transition overran the edge timeout before the first data bit.
    Timeout,
    /// All 40 bits arrived but the checksum byte disagrees.
    BadChecksum { computed: u8, received: u8 },
    /// The line stalled part-way through the data bits.
    Incomplete { bits: u8 },
    /// Checksum matched but the values are outside the sensor's range.
    Implausible,
    /// The GPIO itself reported an error.
    LineFault,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for sensor"),
            Self::BadChecksum { computed, received } => write!(
                f,
                "bad checksum (computed 0x{computed:02x}, received 0x{received:02x})"
            ),
            Self::Incomplete { bits } => write!(f, "incomplete frame ({bits}/40 bits)"),
            Self::Implausible => write!(f, "reading outside sensor range"),
            Self::LineFault => write!(f, "data line GPIO error"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// The two binary outputs the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Fan,
    Alarm,
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fan => write!(f, "fan relay"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// The output pin rejected the write.
    Unavailable(Actuator),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(a) => write!(f, "{a} unavailable"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Why a configuration could not be loaded or stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Nothing stored yet.
    NotFound,
    /// The stored blob does not deserialize.
    Corrupted,
    /// A field is out of range; names the field and its limits.
    ValidationFailed(&'static str),
    /// The storage backend failed.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no stored config"),
            Self::Corrupted => write!(f, "stored config unreadable"),
            Self::ValidationFailed(why) => write!(f, "out of range: {why}"),
            Self::IoError => write!(f, "storage I/O failed"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// `Peripherals::take()` failed (already taken).
    Peripherals,
    /// A GPIO could not be configured; carries the pin role.
    Gpio(&'static str),
    /// The command UART could not be opened.
    Uart,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peripherals => write!(f, "peripherals unavailable"),
            Self::Gpio(role) => write!(f, "GPIO setup failed for {role}"),
            Self::Uart => write!(f, "command UART setup failed"),
        }
    }
}

impl std::error::Error for InitError {}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
