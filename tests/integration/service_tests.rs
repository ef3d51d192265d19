//! Reading source + control service + status publisher, wired the way
//! the runtime wires them but stepped by hand.

use std::sync::Arc;

use smartvent::app::commands::{CommandInbox, CommandSource, CommandToken};
use smartvent::app::events::AppEvent;
use smartvent::app::reader::{PollOutcome, ReadingSource};
use smartvent::app::service::ControlService;
use smartvent::app::status::{StatusPublisher, snapshot};
use smartvent::config::SystemConfig;
use smartvent::control::{ControlState, Mode, SharedState};
use smartvent::error::{Actuator, DecodeError};
use smartvent::sensors::Reading;

use crate::mock_hw::{ActuatorCall, EventLog, FixedSensor, MockActuators, NoDelay, StatusLog};

struct Rig {
    shared: Arc<SharedState>,
    inbox: Arc<CommandInbox>,
    sensor: FixedSensor,
    source: ReadingSource<FixedSensor>,
    hw: MockActuators,
    service: ControlService<MockActuators, NoDelay>,
    events: EventLog,
    now_ms: u64,
}

impl Rig {
    fn new(config: SystemConfig, first: Reading) -> Self {
        let shared = Arc::new(SharedState::new(ControlState::new()));
        let inbox = Arc::new(CommandInbox::new());
        let sensor = FixedSensor::new(Ok(first));
        let source = ReadingSource::new(sensor.clone(), &config);
        let hw = MockActuators::new();
        let mut events = EventLog::default();
        let mut service =
            ControlService::new(&config, hw.clone(), NoDelay, shared.clone(), inbox.clone());
        service.start(&mut events);
        Self {
            shared,
            inbox,
            sensor,
            source,
            hw,
            service,
            events,
            now_ms: 0,
        }
    }

    /// One read interval: capture, then one control cycle.
    fn cycle(&mut self) -> PollOutcome {
        let outcome = self.source.poll(self.now_ms, &self.shared, &mut self.events);
        self.service.tick(&mut self.events);
        self.now_ms += 2_000;
        outcome
    }

    fn mode(&self) -> Mode {
        self.shared.with(|s| s.mode)
    }
}

#[test]
fn start_drives_both_outputs_off() {
    let rig = Rig::new(SystemConfig::default(), Reading::new(20.0, 40.0));
    assert_eq!(
        rig.hw.calls(),
        [ActuatorCall::Fan(false), ActuatorCall::Alarm(false)]
    );
    assert!(matches!(
        rig.events.0[0],
        AppEvent::Started {
            mode: Mode::Automatic
        }
    ));
}

#[test]
fn hot_reading_turns_fan_and_alarm_on() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(29.0, 60.0));
    assert!(matches!(rig.cycle(), PollOutcome::Fresh(_)));

    assert!(rig.hw.fan_on());
    assert!(rig.hw.alarm_on());
    assert_eq!(rig.events.count(|e| *e == AppEvent::FanChanged { on: true }), 1);
    assert_eq!(
        rig.events
            .count(|e| *e == AppEvent::AlertChanged { active: true }),
        1
    );
}

#[test]
fn cooling_down_turns_everything_off_again() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(29.0, 60.0));
    rig.cycle();
    rig.sensor.set(Ok(Reading::new(24.0, 50.0)));
    rig.cycle();

    assert!(!rig.hw.fan_on());
    assert!(!rig.hw.alarm_on());
    assert_eq!(
        rig.hw.calls()[2..],
        [
            ActuatorCall::Fan(true),
            ActuatorCall::Alarm(true),
            ActuatorCall::Fan(false),
            ActuatorCall::Alarm(false),
        ]
    );
}

#[test]
fn hysteresis_keeps_fan_running_inside_band() {
    let config = SystemConfig {
        fan_hysteresis_c: 2.0,
        ..SystemConfig::default()
    };
    let mut rig = Rig::new(config, Reading::new(28.5, 40.0));
    rig.cycle();
    assert!(rig.hw.fan_on());

    rig.sensor.set(Ok(Reading::new(26.5, 40.0)));
    rig.cycle();
    assert!(rig.hw.fan_on(), "26.5 is inside the 2 °C band");

    rig.sensor.set(Ok(Reading::new(25.9, 40.0)));
    rig.cycle();
    assert!(!rig.hw.fan_on());
}

#[test]
fn manual_override_sticks_until_set_auto() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(29.0, 60.0));
    rig.cycle();
    assert!(rig.hw.fan_on());

    rig.inbox.post(CommandSource::Manual, CommandToken::FanOff);
    rig.cycle();
    assert_eq!(rig.mode(), Mode::Manual);
    assert!(!rig.hw.fan_on());

    // Still hot; the automatic rule stays out of it.
    for _ in 0..5 {
        rig.cycle();
    }
    assert!(!rig.hw.fan_on());

    // Back to automatic: the last reading is re-evaluated straight away.
    rig.inbox.post(CommandSource::Manual, CommandToken::SetAuto);
    rig.service.tick(&mut rig.events);
    assert_eq!(rig.mode(), Mode::Automatic);
    assert!(rig.hw.fan_on());
}

#[test]
fn remote_command_wins_over_manual_in_the_same_cycle() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(20.0, 40.0));
    rig.cycle();

    rig.inbox.post(CommandSource::Manual, CommandToken::FanOff);
    rig.inbox.post(CommandSource::Remote, CommandToken::FanOn);
    rig.service.tick(&mut rig.events);

    assert_eq!(rig.mode(), Mode::Remote);
    assert!(rig.hw.fan_on());
    let applied: Vec<_> = rig
        .events
        .0
        .iter()
        .filter_map(|e| match e {
            AppEvent::CommandApplied { source, .. } => Some(*source),
            _ => None,
        })
        .collect();
    assert_eq!(applied, [CommandSource::Manual, CommandSource::Remote]);
}

#[test]
fn sustained_warning_rings_the_alarm_once() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(20.0, 75.0));
    for _ in 0..10 {
        rig.cycle();
    }
    let alarm: Vec<_> = rig
        .hw
        .calls()
        .into_iter()
        .skip(2)
        .filter(|c| matches!(c, ActuatorCall::Alarm(_)))
        .collect();
    assert_eq!(alarm, [ActuatorCall::Alarm(true)]);
}

#[test]
fn alarm_hold_pulses_once_per_episode() {
    let config = SystemConfig {
        alarm_hold_ms: 500,
        ..SystemConfig::default()
    };
    let mut rig = Rig::new(config, Reading::new(29.0, 40.0));
    for _ in 0..4 {
        rig.cycle();
    }
    rig.sensor.set(Ok(Reading::new(20.0, 40.0)));
    rig.cycle();
    rig.sensor.set(Ok(Reading::new(29.0, 40.0)));
    rig.cycle();

    let alarm: Vec<_> = rig
        .hw
        .calls()
        .into_iter()
        .skip(2)
        .filter(|c| matches!(c, ActuatorCall::Alarm(_)))
        .collect();
    assert_eq!(
        alarm,
        [
            ActuatorCall::Alarm(true),
            ActuatorCall::Alarm(false),
            ActuatorCall::Alarm(true),
            ActuatorCall::Alarm(false),
        ]
    );
}

#[test]
fn failed_fan_write_is_retried_next_cycle() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(29.0, 60.0));
    rig.hw.break_fan(true);
    rig.cycle();
    assert!(!rig.hw.fan_on());
    assert_eq!(
        rig.events.count(|e| *e
            == AppEvent::ActuatorFault {
                actuator: Actuator::Fan
            }),
        1
    );

    rig.hw.break_fan(false);
    rig.service.tick(&mut rig.events);
    assert!(rig.hw.fan_on());
}

#[test]
fn read_failures_keep_last_reading_and_mark_status_stale() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(29.0, 60.0));
    let mut publisher = StatusPublisher::new(3);
    let mut status = StatusLog::default();

    rig.cycle();
    assert!(publisher.publish(&rig.shared, &mut status));
    assert!(!publisher.publish(&rig.shared, &mut status), "unchanged");

    rig.sensor.set(Err(DecodeError::Timeout));
    for _ in 0..3 {
        assert_eq!(rig.cycle(), PollOutcome::Failed(DecodeError::Timeout));
    }
    assert!(publisher.publish(&rig.shared, &mut status));

    let last = status.0.last().unwrap();
    assert!(last.valid);
    assert!(last.stale);
    assert_eq!(last.temperature, 29.0);
    assert_eq!(last.last_reading_ms, Some(0));
    assert!(rig.hw.fan_on(), "a failed read never changes the outputs");
    assert_eq!(
        rig.events.count(|e| matches!(
            e,
            AppEvent::ReadingFailed {
                consecutive: 3,
                ..
            }
        )),
        1
    );
}

#[test]
fn reads_are_throttled_to_the_interval() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(20.0, 40.0));
    rig.cycle();
    assert_eq!(
        rig.source.poll(1_500, &rig.shared, &mut rig.events),
        PollOutcome::Throttled
    );
    assert_eq!(rig.sensor.reads(), 1);
}

#[test]
fn shutdown_forces_outputs_off() {
    let mut rig = Rig::new(SystemConfig::default(), Reading::new(29.0, 60.0));
    rig.cycle();
    rig.service.shutdown(&mut rig.events).unwrap();

    assert!(!rig.hw.fan_on());
    assert!(!rig.hw.alarm_on());
    assert!(rig.service.is_stopped());
    assert_eq!(rig.events.0.last(), Some(&AppEvent::Stopped));

    // Once stopped, commands neither drive pins nor change the state.
    let before = rig.hw.calls().len();
    rig.inbox.post(CommandSource::Remote, CommandToken::FanOn);
    assert!(rig.service.tick(&mut rig.events).is_empty());
    assert!(
        rig.service
            .handle_command(CommandSource::Manual, CommandToken::FanOn, &mut rig.events)
            .is_empty()
    );
    assert_eq!(rig.hw.calls().len(), before);

    let status = snapshot(&rig.shared, 3);
    assert!(!status.fan_on, "reported fan must match the relay");
    assert!(!status.alert_active);
    assert_eq!(status.mode, Mode::Automatic);
}
