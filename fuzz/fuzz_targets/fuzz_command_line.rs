//! Fuzz target: `CommandLineDecoder::feed`
//!
//! Arbitrary bytes from the command UART must never panic the tokenizer,
//! and a trailing separator always flushes the pending word.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use libfuzzer_sys::fuzz_target;
use smartvent::adapters::command_link::{CommandLineDecoder, Decoded, MAX_TOKEN_LEN};

fuzz_target!(|data: &[u8]| {
    let mut decoder = CommandLineDecoder::new();
    for &byte in data {
        if let Some(Decoded::Unknown(word)) = decoder.feed(byte) {
            assert!(word.len() <= MAX_TOKEN_LEN);
        }
    }

    let _ = decoder.feed(b'\n');
    assert_eq!(decoder.feed(b'\n'), None);
});
