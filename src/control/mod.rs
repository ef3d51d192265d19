//! Control core: the shared state record and the arbitration rules.

pub mod arbiter;
pub mod state;

pub use arbiter::{Arbiter, Evaluation, Thresholds};
pub use state::{ControlState, Mode, SharedState, SENTINEL};
