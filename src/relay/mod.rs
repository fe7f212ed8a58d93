//! Game -> Discord broadcast relay.
//!
//! ## Module Structure
//!
//! - `relay`: Intake, classification and deduplication (`ChatRelay`)
//! - `worker`: Queue consumer with bounded retry (`RelayWorker`)
//! - `sink`: The destination trait (`ChatSink`)
//! - `dedup`: Idempotency window
//! - `filter`: Regex message filters
//! - `formatter`: Placeholder formatting and message splitting

pub mod dedup;
pub mod filter;
pub mod formatter;
#[allow(clippy::module_inception)]
pub mod relay;
pub mod sink;
pub mod worker;

pub use filter::{FilterDirection, MessageFilter};
pub use formatter::{MessageFormatter, RelayFormats};
pub use relay::{ChatRelay, RelayOutcome};
pub use sink::ChatSink;
pub use worker::RelayWorker;
