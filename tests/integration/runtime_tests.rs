//! Full runtime on host threads: reader, control and command-link tasks.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use smartvent::adapters::command_link::CommandLink;
use smartvent::adapters::time::{StdDelay, SystemClock};
use smartvent::app::commands::{CommandInbox, CommandSource};
use smartvent::app::runtime::Runtime;
use smartvent::config::SystemConfig;
use smartvent::control::{ControlState, Mode, SharedState};
use smartvent::drivers::task_pin::{TaskSpawner, TaskSpec, spawn_on_core};
use smartvent::error::DecodeError;
use smartvent::sensors::Reading;

use crate::mock_hw::{ActuatorCall, FixedSensor, MockActuators, QueueTransport};

fn fast_config() -> SystemConfig {
    SystemConfig {
        sensor_read_interval_ms: 1_000,
        control_loop_interval_ms: 10,
        command_poll_interval_ms: 10,
        ..SystemConfig::default()
    }
}

/// Poll `cond` until it holds or two seconds pass.
fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

struct Harness {
    runtime: Runtime<FixedSensor>,
    sensor: FixedSensor,
    hw: MockActuators,
    uart: QueueTransport,
}

fn spawn(reading: Result<Reading, DecodeError>) -> Harness {
    let config = fast_config();
    let shared = Arc::new(SharedState::new(ControlState::new()));
    let inbox = Arc::new(CommandInbox::new());
    let sensor = FixedSensor::new(reading);
    let hw = MockActuators::new();
    let uart = QueueTransport::default();
    let link = CommandLink::new(uart.clone(), inbox.clone(), CommandSource::Remote);

    let runtime = Runtime::spawn(
        &config,
        shared,
        inbox,
        sensor.clone(),
        SystemClock::new(),
        hw.clone(),
        StdDelay,
        link,
    )
    .unwrap();

    Harness {
        runtime,
        sensor,
        hw,
        uart,
    }
}

#[test]
fn hot_reading_drives_fan_through_the_tasks() {
    let h = spawn(Ok(Reading::new(30.0, 50.0)));

    assert!(eventually(|| h.hw.fan_on()), "fan never switched on");
    assert!(h.hw.alarm_on());
    assert_eq!(h.sensor.reads(), 1, "read interval is one second");

    h.runtime.shutdown().unwrap();
}

#[test]
fn remote_tokens_reach_the_control_task() {
    let h = spawn(Ok(Reading::new(30.0, 50.0)));
    assert!(eventually(|| h.hw.fan_on()));

    h.uart.send("fan_off\n");
    assert!(eventually(|| !h.hw.fan_on()));
    assert_eq!(h.runtime.shared().with(|s| s.mode), Mode::Remote);

    h.uart.send("REMOTE_AUTO\n");
    assert!(eventually(|| h.hw.fan_on()), "auto re-evaluates last reading");
    assert_eq!(h.runtime.shared().with(|s| s.mode), Mode::Automatic);

    h.runtime.shutdown().unwrap();
}

#[test]
fn failing_sensor_leaves_outputs_off() {
    let h = spawn(Err(DecodeError::Timeout));

    assert!(eventually(|| h.runtime.shared().with(|s| s.consecutive_failures) >= 1));
    assert!(!h.runtime.shared().with(|s| s.has_reading()));
    assert!(!h.hw.fan_on());

    h.runtime.shutdown().unwrap();
}

#[test]
fn shutdown_clears_outputs_before_returning_sensor() {
    let h = spawn(Ok(Reading::new(30.0, 80.0)));
    assert!(eventually(|| h.hw.fan_on() && h.hw.alarm_on()));

    let sensor = h.runtime.shutdown().unwrap();

    let calls = h.hw.calls();
    assert_eq!(
        calls[calls.len() - 2..],
        [ActuatorCall::Fan(false), ActuatorCall::Alarm(false)]
    );
    assert!(sensor.reads() >= 1);

    // Tasks are gone: nothing is driven after shutdown.
    h.uart.send("FAN_ON\n");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(h.hw.calls().len(), calls.len());
}

/// Starts tasks normally until the `fail_at`-th spawn (zero-based), which
/// is refused.
struct FailingSpawner {
    fail_at: usize,
    spawned: usize,
}

impl TaskSpawner for FailingSpawner {
    fn spawn<T, F>(&mut self, spec: TaskSpec, f: F) -> io::Result<JoinHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.spawned == self.fail_at {
            return Err(io::Error::other("out of task memory"));
        }
        self.spawned += 1;
        spawn_on_core(spec, f)
    }
}

fn spawn_failing_at(
    fail_at: usize,
    hw: &MockActuators,
    uart: &QueueTransport,
) -> anyhow::Result<()> {
    let config = fast_config();
    let shared = Arc::new(SharedState::new(ControlState::new()));
    let inbox = Arc::new(CommandInbox::new());
    let link = CommandLink::new(uart.clone(), inbox.clone(), CommandSource::Remote);
    let mut spawner = FailingSpawner { fail_at, spawned: 0 };

    Runtime::spawn_with(
        &mut spawner,
        &config,
        shared,
        inbox,
        FixedSensor::new(Ok(Reading::new(30.0, 80.0))),
        SystemClock::new(),
        hw.clone(),
        StdDelay,
        link,
    )
    .map(drop)
}

fn all_off(calls: &[ActuatorCall]) -> bool {
    calls
        .iter()
        .all(|c| matches!(c, ActuatorCall::Fan(false) | ActuatorCall::Alarm(false)))
}

#[test]
fn failed_reader_start_stops_control_task() {
    let hw = MockActuators::new();
    let uart = QueueTransport::default();

    let err = spawn_failing_at(1, &hw, &uart).unwrap_err();
    assert!(format!("{err:#}").contains("spawning reader task"));

    // Control ran start and then shutdown before the error came back.
    let calls = hw.calls();
    assert!(calls.len() >= 4, "{calls:?}");
    assert_eq!(
        calls[calls.len() - 2..],
        [ActuatorCall::Fan(false), ActuatorCall::Alarm(false)]
    );
    assert!(all_off(&calls), "no reader, so nothing turns on: {calls:?}");

    uart.send("FAN_ON\n");
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hw.calls().len(), calls.len(), "control task still running");
}

#[test]
fn failed_command_start_stops_earlier_tasks() {
    let hw = MockActuators::new();
    let uart = QueueTransport::default();

    let err = spawn_failing_at(2, &hw, &uart).unwrap_err();
    assert!(format!("{err:#}").contains("spawning command task"));

    let calls = hw.calls();
    assert_eq!(
        calls[calls.len() - 2..],
        [ActuatorCall::Fan(false), ActuatorCall::Alarm(false)]
    );
    assert!(!hw.fan_on() && !hw.alarm_on());

    thread::sleep(Duration::from_millis(50));
    assert_eq!(hw.calls().len(), calls.len(), "a task outlived the failed start");
}
