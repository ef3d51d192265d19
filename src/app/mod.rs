//! Application core: domain logic behind port traits.
//!
//! The reading source, control service and status publisher live here.
//! All interaction with hardware happens through the traits in [`ports`],
//! keeping this layer fully testable without real peripherals.
//! [`runtime`] wires them into concurrently running tasks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod reader;
pub mod runtime;
pub mod service;
pub mod status;
