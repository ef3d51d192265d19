//! SmartVent Firmware: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  DhtSensor        RelayActuators   LogEventSink  NvsConfig   │
//! │  (HumiditySensor) (ActuatorPort)   (EventSink)   (ConfigPort)│
//! │  CommandLink      JsonStatusSink / LcdStatusSink             │
//! │  (UART tokens)    (StatusSink)                               │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  ReadingSource · ControlService (Arbiter) · Status     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  Runtime: reader + control on APP core, command link on PRO  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use smartvent::adapters::command_link::{CommandLink, UartCommandTransport};
use smartvent::adapters::hardware::init_board;
use smartvent::adapters::nvs::NvsConfigStore;
use smartvent::adapters::status_sink::{JsonStatusSink, LcdStatusSink, LogDisplay};
use smartvent::adapters::time::SystemClock;
use smartvent::app::commands::{CommandInbox, CommandSource};
use smartvent::app::runtime::Runtime;
use smartvent::app::status::StatusPublisher;
use smartvent::config::SystemConfig;
use smartvent::control::{ControlState, SharedState};
use smartvent::error::InitError;
use smartvent::sensors::dht::DhtSensor;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("SmartVent v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let config = match NvsConfigStore::new() {
        Ok(nvs) => nvs.load_or_default(),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Peripherals (fatal on failure) ─────────────────────
    let peripherals = Peripherals::take().map_err(|_| InitError::Peripherals)?;
    let board = init_board(peripherals, &config)?;

    // ── 4. Wire adapters to the core ──────────────────────────
    let shared = Arc::new(SharedState::new(ControlState::new()));
    let inbox = Arc::new(CommandInbox::new());

    let sensor = DhtSensor::from_config(board.sensor_pin, Ets, SystemClock::new(), &config);
    let link = CommandLink::new(
        UartCommandTransport::new(board.command_uart),
        inbox.clone(),
        CommandSource::Remote,
    );

    let runtime = Runtime::spawn(
        &config,
        shared,
        inbox,
        sensor,
        SystemClock::new(),
        board.actuators,
        FreeRtos,
        link,
    )?;

    // ── 5. Observer loop: publish status on change ────────────
    let mut publisher = StatusPublisher::new(config.stale_after_failures);
    let mut sinks = (
        JsonStatusSink::new(std::io::stdout()),
        LcdStatusSink::new(LogDisplay),
    );
    let period = Duration::from_millis(u64::from(config.control_loop_interval_ms));

    info!("System ready. Entering status loop.");
    loop {
        publisher.publish(runtime.shared(), &mut sinks);
        std::thread::sleep(period);
    }
}
