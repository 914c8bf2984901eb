#![cfg_attr(not(test), no_std)]
//! Bus-level engine for emulating a PlayStation digital controller.
//!
//! The engine bit-bangs the synchronous controller bus (select, clock,
//! command, data, acknowledge) through the [`PadBus`] trait and answers the
//! poll command with the current button state. Everything here is statically
//! sized and lock-free so it can be shared between the protocol context and
//! the sampling context without a scheduler.

#[macro_use]
mod fmt;

mod abort;
mod buttons;
mod calibrator;
mod channel;
mod config;
mod error;
mod guard;
mod line;
mod primitives;
mod protocol;
mod stats;
mod status;
mod time;

pub use abort::AbortSignal;
pub use buttons::{Button, ButtonSnapshot};
pub use calibrator::{
    CalibrationEvent, CalibrationStatus, Calibrator, Candidate,
};
pub use channel::{ButtonChannel, ButtonPublisher};
pub use config::{
    AckMode, BusConfig, CalibrationConfig, PadSettings, RecordError,
    CONFIG_MAGIC, RECORD_LEN,
};
pub use error::BusError;
pub use guard::{PreemptionGuard, Unguarded};
pub use line::{LineState, PadBus};
pub use primitives::{AckTiming, BusDriver};
pub use protocol::{
    Engine, Outcome, ADDR_CONTROLLER, ADDR_MEMORY_CARD, CMD_POLL,
    ID_DIGITAL_HI, ID_DIGITAL_LO, IGNORED_ADDRESSES, SENTINEL,
};
pub use stats::{IntervalStats, Telemetry, TransactionStats};
pub use status::{LedStatus, StatusPattern, StatusTracker};
pub use time::{poll_until, Timebase};
