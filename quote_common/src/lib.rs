//!
//! Common types shared by the quote streaming core and its consumers.
//!
//! This crate aggregates:
//! - `error` — unified error type `StreamError` used across the workspace.
//! - `result` — handy `Result<T, StreamError>` alias.
//! - `symbols` — symbol lists, parsing helpers and the per-stream symbol cap.
//! - `quote` — the static quote field set, fragments and snapshots.
//! - `net` — endpoint environments and stream URL construction.
#![warn(missing_docs)]
pub mod error;
pub mod net;
pub mod quote;
pub mod result;
pub mod symbols;

pub use error::StreamError;
pub use quote::{FieldUpdate, QuoteField, QuoteFragment, QuoteSnapshot};
pub use result::Result;
pub use symbols::SymbolList;
