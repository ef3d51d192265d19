//! Status sink adapters.
//!
//! | Adapter          | Output                                        |
//! |------------------|-----------------------------------------------|
//! | `JsonStatusSink` | one JSON object per line (dashboard / serial) |
//! | `LcdStatusSink`  | two 16-column text lines for a character LCD  |
//!
//! Several sinks can be combined as a tuple.

use core::fmt::Write as _;
use std::io::Write;

use heapless::String;
use log::{info, warn};

use crate::app::ports::StatusSink;
use crate::app::status::StatusSnapshot;

/// Columns on the character display.
pub const LCD_COLUMNS: usize = 16;

pub type LcdLine = String<LCD_COLUMNS>;

// ── JSON lines ────────────────────────────────────────────────

/// Writes each snapshot as a single-line JSON object.
pub struct JsonStatusSink<W> {
    out: W,
}

impl<W: Write> JsonStatusSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusSink for JsonStatusSink<W> {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        let line = match serde_json::to_string(snapshot) {
            Ok(line) => line,
            Err(e) => {
                warn!("status: serialise failed: {}", e);
                return;
            }
        };
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            warn!("status: write failed: {}", e);
        }
    }
}

// ── Character LCD ─────────────────────────────────────────────

/// Something that can show two lines of text.
pub trait CharacterDisplay {
    fn show(&mut self, lines: &[LcdLine; 2]);
}

/// Renders a snapshot the way the front panel shows it.
///
/// While the alert is active: `FAN ON NOW!` over a compact
/// `T:29.0C H:60%`. Otherwise one value per line. A `!` in the last
/// column of the bottom line marks a stale reading; dashes stand in before
/// the first reading.
pub fn render_lcd(s: &StatusSnapshot) -> [LcdLine; 2] {
    let mut top = LcdLine::new();
    let mut bottom = LcdLine::new();

    // At most 15 columns for the sensors' value ranges; column 16 is
    // reserved for the stale marker.
    if !s.valid {
        let _ = write!(top, "Temp: --.- C");
        let _ = write!(bottom, "Humi: --.- %");
    } else if s.alert_active {
        let _ = write!(top, "FAN ON NOW!");
        let _ = write!(bottom, "T:{:.1}C H:{:.0}%", s.temperature, s.humidity);
    } else {
        let _ = write!(top, "Temp: {:.1} C", s.temperature);
        let _ = write!(bottom, "Humi: {:.1} %", s.humidity);
    }
    for line in [&mut top, &mut bottom] {
        while line.len() < LCD_COLUMNS - 1 {
            let _ = line.push(' ');
        }
    }
    let _ = top.push(' ');
    let _ = bottom.push(if s.stale { '!' } else { ' ' });
    [top, bottom]
}

pub struct LcdStatusSink<D> {
    display: D,
}

impl<D: CharacterDisplay> LcdStatusSink<D> {
    pub fn new(display: D) -> Self {
        Self { display }
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

impl<D: CharacterDisplay> StatusSink for LcdStatusSink<D> {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        self.display.show(&render_lcd(snapshot));
    }
}

/// Mirrors the LCD lines to the log when no panel is fitted.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl CharacterDisplay for LogDisplay {
    fn show(&mut self, lines: &[LcdLine; 2]) {
        info!("LCD | {} | {}", lines[0], lines[1]);
    }
}

// ── Fan-out ───────────────────────────────────────────────────

impl<A: StatusSink, B: StatusSink> StatusSink for (A, B) {
    fn publish(&mut self, snapshot: &StatusSnapshot) {
        self.0.publish(snapshot);
        self.1.publish(snapshot);
    }
}
