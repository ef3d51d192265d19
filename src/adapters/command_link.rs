//! Command link adapter: byte stream → [`CommandToken`]s → inbox.
//!
//! Tokens are ASCII words separated by newlines, spaces, `;` or `,`
//! (`FAN_ON\n`, `set_auto;fan_off`). Words longer than
//! [`MAX_TOKEN_LEN`] are discarded whole. Unknown words are logged and
//! dropped; they never reach the control core.
//!
//! On the device the bytes come from a UART polled without blocking.

use std::sync::Arc;

use heapless::Vec;
use log::{debug, warn};

use crate::app::commands::{CommandInbox, CommandSource, CommandToken};
use crate::app::ports::CommandTransport;

/// Longest accepted token (`REMOTE_AUTO` + slack).
pub const MAX_TOKEN_LEN: usize = 24;

const READ_CHUNK: usize = 64;

/// Incremental tokenizer; keeps partial words across reads.
#[derive(Debug, Default)]
pub struct CommandLineDecoder {
    word: Vec<u8, MAX_TOKEN_LEN>,
    overflowed: bool,
}

/// What a completed word turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Token(CommandToken),
    Unknown(heapless::String<MAX_TOKEN_LEN>),
    Overlong,
}

impl CommandLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_separator(byte: u8) -> bool {
        matches!(byte, b'\n' | b'\r' | b' ' | b'\t' | b';' | b',')
    }

    /// Feed one byte; returns a result when it completes a word.
    pub fn feed(&mut self, byte: u8) -> Option<Decoded> {
        if !Self::is_separator(byte) {
            if self.word.push(byte).is_err() {
                self.overflowed = true;
            }
            return None;
        }
        if self.overflowed {
            self.word.clear();
            self.overflowed = false;
            return Some(Decoded::Overlong);
        }
        if self.word.is_empty() {
            return None;
        }
        let decoded = match core::str::from_utf8(&self.word) {
            Ok(text) => match text.parse::<CommandToken>() {
                Ok(token) => Decoded::Token(token),
                Err(_) => {
                    let mut s = heapless::String::new();
                    let _ = s.push_str(text);
                    Decoded::Unknown(s)
                }
            },
            Err(_) => Decoded::Unknown(heapless::String::new()),
        };
        self.word.clear();
        Some(decoded)
    }
}

/// Polls a [`CommandTransport`] and posts decoded tokens to the inbox.
pub struct CommandLink<T> {
    transport: T,
    decoder: CommandLineDecoder,
    inbox: Arc<CommandInbox>,
    source: CommandSource,
}

impl<T: CommandTransport> CommandLink<T> {
    pub fn new(transport: T, inbox: Arc<CommandInbox>, source: CommandSource) -> Self {
        Self {
            transport,
            decoder: CommandLineDecoder::new(),
            inbox,
            source,
        }
    }

    /// Drain everything the transport has pending. Returns the number of
    /// tokens posted; 0 when the line is quiet.
    pub fn poll(&mut self) -> usize {
        let mut buf = [0u8; READ_CHUNK];
        let mut posted = 0;
        loop {
            let n = self.transport.poll_read(&mut buf);
            if n == 0 {
                break;
            }
            for &byte in &buf[..n.min(READ_CHUNK)] {
                match self.decoder.feed(byte) {
                    Some(Decoded::Token(token)) => {
                        debug!("cmdlink: {} from {}", token, self.source.as_str());
                        self.inbox.post(self.source, token);
                        posted += 1;
                    }
                    Some(Decoded::Unknown(word)) => {
                        warn!("cmdlink: ignoring unknown token '{}'", word);
                    }
                    Some(Decoded::Overlong) => {
                        warn!("cmdlink: discarded token longer than {} bytes", MAX_TOKEN_LEN);
                    }
                    None => {}
                }
            }
        }
        posted
    }
}

// ── UART transport (device) ───────────────────────────────────

#[cfg(target_os = "espidf")]
pub use uart::UartCommandTransport;

#[cfg(target_os = "espidf")]
mod uart {
    use esp_idf_hal::delay::NON_BLOCK;
    use esp_idf_hal::uart::UartDriver;
    use log::warn;

    use crate::app::ports::CommandTransport;

    /// Remote command channel on a hardware UART.
    pub struct UartCommandTransport {
        uart: UartDriver<'static>,
    }

    impl UartCommandTransport {
        pub fn new(uart: UartDriver<'static>) -> Self {
            Self { uart }
        }
    }

    impl CommandTransport for UartCommandTransport {
        fn poll_read(&mut self, buf: &mut [u8]) -> usize {
            match self.uart.read(buf, NON_BLOCK) {
                Ok(n) => n,
                Err(e) => {
                    warn!("cmdlink: UART read error {}", e);
                    0
                }
            }
        }
    }
}
