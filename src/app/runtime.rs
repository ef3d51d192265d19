//! Task orchestration.
//!
//! ```text
//!  reader  (App core) ── ReadingSource::poll ──▶ SharedState ◀── ControlService::tick ── control (App core)
//!  command (Pro core) ── CommandLink::poll   ──▶ CommandInbox ─────────────┘
//! ```
//!
//! All three loops check one stop flag every iteration. Shutdown joins the
//! control task first, so both outputs are OFF before the reader hands the
//! sensor (and its GPIO) back to the caller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use embedded_hal::delay::DelayNs;
use log::{error, info};

use crate::adapters::command_link::CommandLink;
use crate::adapters::log_sink::LogEventSink;
use crate::config::SystemConfig;
use crate::control::SharedState;
use crate::drivers::task_pin::{Core, PinnedSpawner, TaskSpawner, TaskSpec};

use super::commands::CommandInbox;
use super::ports::{ActuatorPort, CommandTransport, HumiditySensor, MonotonicClock};
use super::reader::ReadingSource;
use super::service::ControlService;

/// Longest single sleep in the reader loop, so the stop flag is seen
/// promptly even with long read intervals.
const READER_SLICE_MS: u64 = 50;

const READER_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 10,
    stack_kb: 8,
    name: "reader\0",
};

const CONTROL_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 8,
    stack_kb: 8,
    name: "control\0",
};

const COMMAND_TASK: TaskSpec = TaskSpec {
    core: Core::Pro,
    priority: 5,
    stack_kb: 6,
    name: "cmdlink\0",
};

/// Handles to the running tasks. `S` is the sensor type, returned on
/// shutdown.
pub struct Runtime<S> {
    stop: Arc<AtomicBool>,
    shared: Arc<SharedState>,
    inbox: Arc<CommandInbox>,
    reader: JoinHandle<S>,
    control: JoinHandle<()>,
    command: JoinHandle<()>,
}

impl<S> Runtime<S>
where
    S: HumiditySensor + Send + 'static,
{
    /// Start the reader, command-link and control tasks.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<C, A, D, T>(
        config: &SystemConfig,
        shared: Arc<SharedState>,
        inbox: Arc<CommandInbox>,
        sensor: S,
        clock: C,
        actuators: A,
        delay: D,
        link: CommandLink<T>,
    ) -> Result<Self>
    where
        C: MonotonicClock + Send + 'static,
        A: ActuatorPort + Send + 'static,
        D: DelayNs + Send + 'static,
        T: CommandTransport + Send + 'static,
    {
        Self::spawn_with(
            &mut PinnedSpawner,
            config,
            shared,
            inbox,
            sensor,
            clock,
            actuators,
            delay,
            link,
        )
    }

    /// Like [`Runtime::spawn`], starting tasks through `spawner`.
    ///
    /// If a later task fails to start, the ones already running are
    /// stopped and joined before the error is returned, so the outputs are
    /// OFF again.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_with<P, C, A, D, T>(
        spawner: &mut P,
        config: &SystemConfig,
        shared: Arc<SharedState>,
        inbox: Arc<CommandInbox>,
        sensor: S,
        clock: C,
        actuators: A,
        delay: D,
        link: CommandLink<T>,
    ) -> Result<Self>
    where
        P: TaskSpawner,
        C: MonotonicClock + Send + 'static,
        A: ActuatorPort + Send + 'static,
        D: DelayNs + Send + 'static,
        T: CommandTransport + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));

        let control = {
            let stop = stop.clone();
            let interval = Duration::from_millis(u64::from(config.control_loop_interval_ms));
            let mut service =
                ControlService::new(config, actuators, delay, shared.clone(), inbox.clone());
            spawner.spawn(CONTROL_TASK, move || {
                let mut sink = LogEventSink::new();
                service.start(&mut sink);
                while !stop.load(Ordering::Acquire) {
                    service.tick(&mut sink);
                    thread::sleep(interval);
                }
                if let Err(e) = service.shutdown(&mut sink) {
                    error!("Outputs could not be cleared on shutdown: {}", e);
                }
            })
            .context("spawning control task")?
        };

        let reader = {
            let stop = stop.clone();
            let shared = shared.clone();
            let mut source = ReadingSource::new(sensor, config);
            spawner.spawn(READER_TASK, move || {
                let mut sink = LogEventSink::new();
                while !stop.load(Ordering::Acquire) {
                    let now = clock.now_ms();
                    source.poll(now, &shared, &mut sink);
                    let wait = source.ms_until_due(clock.now_ms()).clamp(1, READER_SLICE_MS);
                    thread::sleep(Duration::from_millis(wait));
                }
                source.into_sensor()
            })
        };
        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                stop.store(true, Ordering::Release);
                join_after_failed_start("control", control);
                return Err(e).context("spawning reader task");
            }
        };

        let command = {
            let stop = stop.clone();
            let interval = Duration::from_millis(u64::from(config.command_poll_interval_ms));
            let mut link = link;
            spawner.spawn(COMMAND_TASK, move || {
                while !stop.load(Ordering::Acquire) {
                    link.poll();
                    thread::sleep(interval);
                }
            })
        };
        let command = match command {
            Ok(handle) => handle,
            Err(e) => {
                stop.store(true, Ordering::Release);
                join_after_failed_start("control", control);
                join_after_failed_start("reader", reader);
                return Err(e).context("spawning command task");
            }
        };

        info!("Runtime started");
        Ok(Self {
            stop,
            shared,
            inbox,
            reader,
            control,
            command,
        })
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn inbox(&self) -> &Arc<CommandInbox> {
        &self.inbox
    }

    /// Stop every task. Outputs are driven OFF before the sensor is
    /// released; the sensor is returned to the caller.
    pub fn shutdown(self) -> Result<S> {
        info!("Runtime shutting down");
        self.stop.store(true, Ordering::Release);

        let control = self
            .control
            .join()
            .map_err(|_| anyhow!("control task panicked"));
        let sensor = self
            .reader
            .join()
            .map_err(|_| anyhow!("reader task panicked"));
        let command = self
            .command
            .join()
            .map_err(|_| anyhow!("command task panicked"));

        control?;
        command?;
        let sensor = sensor?;
        info!("Runtime stopped");
        Ok(sensor)
    }
}

/// Join a task stopped because bring-up failed. A panic here is only
/// logged; the spawn error is what the caller gets.
fn join_after_failed_start<T>(name: &str, handle: JoinHandle<T>) {
    if handle.join().is_err() {
        error!("{} task panicked while unwinding a failed start", name);
    }
}
