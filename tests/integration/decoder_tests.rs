//! DHT decoder against the simulated single-wire bus.

use smartvent::app::ports::HumiditySensor;
use smartvent::error::DecodeError;
use smartvent::sensors::SensorModel;
use smartvent::sensors::dht::{DhtSensor, WireTiming};

use crate::mock_hw::{WireClock, WireDelay, WireFault, WirePin, WireSim, frame_of};

type SimSensor = DhtSensor<WirePin, WireDelay, WireClock>;

fn sensor(sim: &WireSim, model: SensorModel) -> SimSensor {
    DhtSensor::new(
        sim.pin(),
        sim.delay(),
        sim.clock(),
        model,
        WireTiming::default(),
    )
}

#[test]
fn valid_frame_decodes_to_reading() {
    let sim = WireSim::new([60, 0, 25, 0, 85]);
    let mut dht = sensor(&sim, SensorModel::Dht11);

    let reading = dht.read().unwrap();
    assert_eq!(reading.humidity, 60.0);
    assert_eq!(reading.temperature, 25.0);
    assert!(reading.valid);
    assert_eq!(sim.triggers(), 1);
    assert!(sim.host_released(), "bus must be released after a read");
}

#[test]
fn checksum_mismatch_is_reported_with_both_sums() {
    let sim = WireSim::new([60, 0, 25, 0, 86]);
    let mut dht = sensor(&sim, SensorModel::Dht11);

    assert_eq!(
        dht.read(),
        Err(DecodeError::BadChecksum {
            computed: 85,
            received: 86
        })
    );
}

#[test]
fn capture_returns_raw_bits_msb_first() {
    let bytes = [0b1010_0101, 0x00, 0xff, 0x01, 0xa5u8.wrapping_add(0xff).wrapping_add(0x01)];
    let sim = WireSim::new(bytes);
    let mut dht = sensor(&sim, SensorModel::Dht11);

    let frame = dht.capture().unwrap();
    assert_eq!(frame.bytes(), bytes);
}

#[test]
fn dht22_frame_with_negative_temperature() {
    // 65.2 %RH, -10.1 °C
    let sim = WireSim::new(frame_of([0x02, 0x8c, 0x80, 0x65]));
    let mut dht = sensor(&sim, SensorModel::Dht22);

    let reading = dht.read().unwrap();
    assert!((reading.humidity - 65.2).abs() < 1e-3);
    assert!((reading.temperature + 10.1).abs() < 1e-3);
}

#[test]
fn disconnected_sensor_times_out() {
    let sim = WireSim::new(frame_of([60, 0, 25, 0])).with_fault(WireFault::Disconnected);
    let mut dht = sensor(&sim, SensorModel::Dht11);
    assert_eq!(dht.read(), Err(DecodeError::Timeout));
    assert!(sim.host_released());
}

#[test]
fn shorted_line_times_out() {
    let sim = WireSim::new(frame_of([60, 0, 25, 0])).with_fault(WireFault::StuckLow);
    let mut dht = sensor(&sim, SensorModel::Dht11);
    assert_eq!(dht.read(), Err(DecodeError::Timeout));
}

#[test]
fn truncated_frame_reports_bits_received() {
    let sim = WireSim::new(frame_of([60, 0, 25, 0])).with_fault(WireFault::TruncatedAfter(12));
    let mut dht = sensor(&sim, SensorModel::Dht11);
    assert_eq!(dht.read(), Err(DecodeError::Incomplete { bits: 12 }));

    // No bit at all after the acknowledgement is a plain timeout.
    let sim = WireSim::new(frame_of([60, 0, 25, 0])).with_fault(WireFault::TruncatedAfter(0));
    let mut dht = sensor(&sim, SensorModel::Dht11);
    assert_eq!(dht.read(), Err(DecodeError::Timeout));
}

#[test]
fn start_signal_too_short_gets_no_answer() {
    let sim = WireSim::new(frame_of([60, 0, 25, 0]));
    let timing = WireTiming {
        start_signal_ms: 0,
        ..WireTiming::default()
    };
    let mut dht = DhtSensor::new(
        sim.pin(),
        sim.delay(),
        sim.clock(),
        SensorModel::Dht11,
        timing,
    );
    assert_eq!(dht.read(), Err(DecodeError::Timeout));
    assert_eq!(sim.triggers(), 0);
}

#[test]
fn implausible_values_are_rejected_after_checksum() {
    // 120 %RH passes the checksum but not the range check.
    let sim = WireSim::new(frame_of([120, 0, 25, 0]));
    let mut dht = sensor(&sim, SensorModel::Dht11);
    assert_eq!(dht.read(), Err(DecodeError::Implausible));
}

#[test]
fn repeated_reads_follow_frame_changes() {
    let sim = WireSim::new(frame_of([40, 0, 20, 0]));
    let mut dht = sensor(&sim, SensorModel::Dht11);
    assert_eq!(dht.read().unwrap().humidity, 40.0);

    sim.set_frame(frame_of([55, 0, 31, 5]));
    let reading = dht.read().unwrap();
    assert_eq!(reading.humidity, 55.0);
    assert!((reading.temperature - 31.5).abs() < 1e-3);
    assert_eq!(sim.triggers(), 2);

    // Each capture is the 18 ms start pulse plus roughly 4 ms of answer.
    assert!(sim.now_us() < 2 * 25_000);
}
