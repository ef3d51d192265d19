//! Fuzz target: sensor frame conversion
//!
//! Packs arbitrary bytes bit-by-bit through `FrameBuilder` and converts
//! them for both sensor models. Conversion must never panic, and any
//! reading it accepts must be inside the physical range of the part.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartvent::error::DecodeError;
use smartvent::sensors::SensorModel;
use smartvent::sensors::frame::FrameBuilder;

fuzz_target!(|data: &[u8]| {
    let mut builder = FrameBuilder::new();
    for i in 0..(data.len() * 8).min(40) {
        builder.push(data[i / 8] & (0x80 >> (i % 8)) != 0);
    }
    let bits = builder.bits();

    let frame = match builder.finish() {
        Ok(frame) => frame,
        Err(e) => {
            assert_eq!(e, DecodeError::Incomplete { bits });
            return;
        }
    };

    for model in [SensorModel::Dht11, SensorModel::Dht22] {
        match frame.to_reading(model) {
            Ok(r) => {
                assert!(frame.verify().is_ok());
                assert!((0.0..=100.0).contains(&r.humidity));
                assert!(model.temperature_range().contains(&r.temperature));
            }
            Err(DecodeError::BadChecksum { computed, received }) => {
                assert_ne!(computed, received);
            }
            Err(_) => {}
        }
    }
});
