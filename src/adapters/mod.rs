//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                  |
//! |----------------|--------------------|------------------------------|
//! | `command_link` | (drives inbox)     | UART / any CommandTransport  |
//! | `hardware`     | ActuatorPort       | ESP32 GPIO (relay, buzzer)   |
//! | `log_sink`     | EventSink          | Serial log output            |
//! | `nvs`          | ConfigPort         | NVS / in-memory store        |
//! | `status_sink`  | StatusSink         | JSON lines, character LCD    |
//! | `time`         | MonotonicClock     | ESP32 system timer / Instant |
//! |                | DelayNs            | thread sleep                 |
//!
//! The sensor itself implements `HumiditySensor` in
//! [`crate::sensors::dht`].

pub mod command_link;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod status_sink;
pub mod time;
