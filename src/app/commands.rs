//! Inbound command tokens and the per-source inbox.
//!
//! Tokens come from two places: the local manual UI (buttons / mode switch)
//! and the remote command link. Each source owns one `embassy-sync`
//! [`Signal`], so a newer token overwrites an unread one and nothing is
//! ever queued beyond the latest command per source.

use core::fmt;
use core::str::FromStr;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use heapless::Vec;

/// Commands the outside world can send into the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandToken {
    /// Force the fan on (enters the source's override mode).
    FanOn,
    /// Force the fan off (enters the source's override mode).
    FanOff,
    /// Hand the fan back to the automatic rule.
    SetAuto,
    /// Enter the override mode with the fan off.
    SetManual,
}

impl CommandToken {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FanOn => "FAN_ON",
            Self::FanOff => "FAN_OFF",
            Self::SetAuto => "SET_AUTO",
            Self::SetManual => "SET_MANUAL",
        }
    }
}

impl fmt::Display for CommandToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token that matched no known command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownCommand;

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown command token")
    }
}

impl FromStr for CommandToken {
    type Err = UnknownCommand;

    /// Case-insensitive; accepts the `REMOTE_*` spellings used by older
    /// dashboards.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const TABLE: [(&str, CommandToken); 8] = [
            ("FAN_ON", CommandToken::FanOn),
            ("REMOTE_ON", CommandToken::FanOn),
            ("FAN_OFF", CommandToken::FanOff),
            ("REMOTE_OFF", CommandToken::FanOff),
            ("SET_AUTO", CommandToken::SetAuto),
            ("REMOTE_AUTO", CommandToken::SetAuto),
            ("SET_MANUAL", CommandToken::SetManual),
            ("MANUAL", CommandToken::SetManual),
        ];
        let s = s.trim();
        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, token)| *token)
            .ok_or(UnknownCommand)
    }
}

/// Where a token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandSource {
    Manual,
    Remote,
}

impl CommandSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Remote => "remote",
        }
    }
}

/// Latest-unread-token mailbox, one slot per [`CommandSource`].
pub struct CommandInbox {
    manual: Signal<CriticalSectionRawMutex, CommandToken>,
    remote: Signal<CriticalSectionRawMutex, CommandToken>,
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self {
            manual: Signal::new(),
            remote: Signal::new(),
        }
    }

    fn slot(&self, source: CommandSource) -> &Signal<CriticalSectionRawMutex, CommandToken> {
        match source {
            CommandSource::Manual => &self.manual,
            CommandSource::Remote => &self.remote,
        }
    }

    /// Post a token, replacing any unread one from the same source.
    pub fn post(&self, source: CommandSource, token: CommandToken) {
        self.slot(source).signal(token);
    }

    /// Non-blocking take of the pending token for `source`.
    pub fn take(&self, source: CommandSource) -> Option<CommandToken> {
        self.slot(source).try_take()
    }

    /// Take everything pending, manual first so that a remote command
    /// arriving in the same cycle has the last word.
    pub fn drain(&self) -> Vec<(CommandSource, CommandToken), 2> {
        let mut out = Vec::new();
        for source in [CommandSource::Manual, CommandSource::Remote] {
            if let Some(token) = self.take(source) {
                // Capacity equals the number of sources.
                let _ = out.push((source, token));
            }
        }
        out
    }
}

impl Default for CommandInbox {
    fn default() -> Self {
        Self::new()
    }
}
