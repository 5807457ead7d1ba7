//!
//! Reconnect-resilient quote-change streaming.
//!
//! The crate consumes a long-lived chunked HTTP stream of incremental quote
//! changes, rebuilds full per-symbol snapshots from them, and delivers those
//! snapshots to one consumer over a channel. Pipeline, leaf first:
//!
//! - `line_reader` — body bytes to text lines, honouring END/ERROR sentinels.
//! - `decoder` — one line to one `QuoteFragment`; malformed lines become empty.
//! - `snapshot` — strict left fold of fragments into a per-session table.
//! - `transport` — streaming GET over reqwest, read as a cancellable blocking body.
//! - `session` — one connection on its own thread, with termination reasons.
//! - `retry` / `controller` — bounded fixed-delay retry, session registry and
//!   event routing.
//! - `events` / `board` — consumer-facing events and an upsert display table.
//!
//! ```no_run
//! use quote_stream::{QuoteBoard, ReconnectController, StreamConfig, events::drain};
//! use url::Url;
//!
//! fn main() -> quote_common::Result<()> {
//!     let config = StreamConfig::new(Url::parse("https://sim-api.tradestation.com/v2")?);
//!     let (controller, events) = ReconnectController::new(config)?;
//!     controller.start("MSFT,GOOG", "access-token")?;
//!
//!     let mut board = QuoteBoard::new();
//!     loop {
//!         drain(&events, &mut board);
//!         std::thread::sleep(std::time::Duration::from_millis(100));
//!     }
//! }
//! ```
#![warn(missing_docs)]
pub mod board;
pub mod config;
pub mod controller;
pub mod decoder;
pub mod events;
pub mod line_reader;
pub mod registry;
pub mod retry;
pub mod session;
pub mod snapshot;
pub mod transport;

#[cfg(test)]
mod testing;

pub use board::QuoteBoard;
pub use config::{RetryPolicy, StreamConfig};
pub use controller::{ReconnectController, StartOutcome};
pub use events::{ConsumerEvent, QuoteConsumer};
pub use session::{Session, SessionEvent, SessionId, TerminationReason};
