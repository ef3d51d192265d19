//! Hardware adapter: bridges real output pins to [`ActuatorPort`].
//!
//! [`RelayActuators`] is generic over `embedded-hal` output pins so the
//! same polarity logic runs on the board and in tests. On ESP-IDF,
//! [`init_board`] claims the peripherals and returns every handle the
//! runtime needs, with both outputs already driven OFF.
//!
//! | Signal         | GPIO | Notes                                  |
//! |----------------|------|----------------------------------------|
//! | DHT data       | 4    | open-drain, internal pull-up enabled   |
//! | Fan relay      | 17   | polarity from `fan_relay_active_low`   |
//! | Alarm buzzer   | 16   | active HIGH                            |
//! | Command UART   | 25/26| TX/RX, UART1, 115200 8N1               |

use embedded_hal::digital::OutputPin;

use crate::app::ports::ActuatorPort;
use crate::error::{Actuator, ActuatorError};

/// Fan relay and alarm buzzer on two GPIOs.
pub struct RelayActuators<F, B> {
    fan: F,
    alarm: B,
    fan_active_low: bool,
}

impl<F: OutputPin, B: OutputPin> RelayActuators<F, B> {
    pub fn new(fan: F, alarm: B, fan_active_low: bool) -> Self {
        Self {
            fan,
            alarm,
            fan_active_low,
        }
    }

    /// Hand the pins back.
    pub fn release(self) -> (F, B) {
        (self.fan, self.alarm)
    }
}

fn drive(pin: &mut impl OutputPin, high: bool, which: Actuator) -> Result<(), ActuatorError> {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.map_err(|_| ActuatorError::Unavailable(which))
}

// ── ActuatorPort implementation ───────────────────────────────

impl<F: OutputPin, B: OutputPin> ActuatorPort for RelayActuators<F, B> {
    fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError> {
        drive(&mut self.fan, on != self.fan_active_low, Actuator::Fan)
    }

    fn set_alarm(&mut self, on: bool) -> Result<(), ActuatorError> {
        drive(&mut self.alarm, on, Actuator::Alarm)
    }
}

// ── Board bring-up (device) ───────────────────────────────────

#[cfg(target_os = "espidf")]
pub use board::{Board, RelayPin, SensorPin, init_board};

#[cfg(target_os = "espidf")]
mod board {
    use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, InputOutput, Output, PinDriver, Pull};
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
    use esp_idf_hal::units::Hertz;
    use log::info;

    use super::RelayActuators;
    use crate::app::ports::ActuatorPort;
    use crate::config::SystemConfig;
    use crate::error::InitError;

    pub type SensorPin = PinDriver<'static, AnyIOPin, InputOutput>;
    pub type RelayPin = PinDriver<'static, AnyOutputPin, Output>;

    /// Every peripheral handle the firmware uses.
    pub struct Board {
        pub sensor_pin: SensorPin,
        pub actuators: RelayActuators<RelayPin, RelayPin>,
        pub command_uart: UartDriver<'static>,
    }

    /// Claim pins and UART. Outputs are driven OFF before anything else
    /// is configured.
    pub fn init_board(p: Peripherals, cfg: &SystemConfig) -> Result<Board, InitError> {
        let fan = PinDriver::output(p.pins.gpio17.downgrade_output())
            .map_err(|_| InitError::Gpio("fan relay"))?;
        let alarm = PinDriver::output(p.pins.gpio16.downgrade_output())
            .map_err(|_| InitError::Gpio("alarm"))?;
        let mut actuators = RelayActuators::new(fan, alarm, cfg.fan_relay_active_low);
        actuators
            .all_off()
            .map_err(|_| InitError::Gpio("relay safe state"))?;

        let mut sensor_pin = PinDriver::input_output_od(p.pins.gpio4.downgrade())
            .map_err(|_| InitError::Gpio("sensor data"))?;
        sensor_pin
            .set_pull(Pull::Up)
            .map_err(|_| InitError::Gpio("sensor pull-up"))?;
        sensor_pin
            .set_high()
            .map_err(|_| InitError::Gpio("sensor idle level"))?;

        let uart_cfg = UartConfig::new().baudrate(Hertz(115_200));
        let command_uart = UartDriver::new(
            p.uart1,
            p.pins.gpio25,
            p.pins.gpio26,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart_cfg,
        )
        .map_err(|_| InitError::Uart)?;

        info!(
            "Board ready (fan relay active-{}, sensor {})",
            if cfg.fan_relay_active_low { "low" } else { "high" },
            cfg.sensor_model
        );
        Ok(Board {
            sensor_pin,
            actuators,
            command_uart,
        })
    }
}
