//! Quote Client — subscribes to a quote-change stream and logs every updated
//! snapshot until the stream ends or Ctrl+C is pressed.
//!
//! Usage example (CLI):
//! ```bash
//! QUOTE_ACCESS_TOKEN=... quote_client --environment simulation --symbols MSFT,GOOG
//! quote_client --base-url http://127.0.0.1:8080/v2 --path ./symbols.txt --token t
//! ```
//!
//! Options may also come from the environment or a `.env` file; see `args`.
//! The token is an input only: obtaining or refreshing it is someone else's job.
//! When the server rejects it, the client exits with an error so the caller can
//! fetch a new one.
#![warn(missing_docs)]
mod args;
mod display;

use crate::args::Args;
use crate::display::ConsoleBoard;
use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{info, warn};
use quote_common::symbols::SymbolParser;
use quote_common::{Result, StreamError, SymbolList};
use quote_stream::{ConsumerEvent, ReconnectController, StreamConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use url::Url;

/// How often the event loop wakes to check for Ctrl+C.
const POLL_INTERVAL_MS: u64 = 500;

/// Drains consumer events on the main thread until nothing streams any more
/// or shutdown is requested.
fn run_event_loop(
    events: &Receiver<ConsumerEvent>,
    console: &mut ConsoleBoard,
    shutdown: &AtomicBool,
) {
    let poll = Duration::from_millis(POLL_INTERVAL_MS);
    while !shutdown.load(Ordering::Relaxed) && !console.is_done() {
        match events.recv_timeout(poll) {
            Ok(event) => event.dispatch(console),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!("Event loop stopping...");
}

fn main() -> Result<(), StreamError> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {e}");
        }
    }
    init_logger();
    let args = Args::parse();

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Ctrl+C handler unavailable: {}", e);
        }
    }

    let symbols = load_symbols(&args)?;
    info!("Symbols: {}", symbols);

    let base_url = match &args.base_url {
        Some(raw) => Url::parse(raw.trim())?,
        None => args.environment.base_url()?,
    };
    let config = StreamConfig::new(base_url)
        .with_connect_timeout(Duration::from_millis(args.connect_timeout_ms));

    let (controller, events) = ReconnectController::new(config)?;
    controller.start(&symbols.to_path_segment(), &args.token)?;

    let mut console = ConsoleBoard::new();
    run_event_loop(&events, &mut console, &shutdown);

    let cancelled = controller.stop()?;
    if cancelled > 0 {
        // Let the cancelled sessions report before exiting.
        while let Ok(event) = events.recv_timeout(Duration::from_millis(POLL_INTERVAL_MS)) {
            event.dispatch(&mut console);
            if console.board().open_sessions() == 0 {
                break;
            }
        }
    }

    info!("{} symbol(s) on the board at exit", console.board().len());
    match console.board().auth_rejected() {
        Some(status) => Err(StreamError::Auth { status }),
        None => Ok(()),
    }
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Symbols from `--path` if given, otherwise from `--symbols`.
fn load_symbols(args: &Args) -> Result<SymbolList> {
    if let Some(raw) = &args.path {
        let file_path = normalize_path(raw);
        if !is_file_exist(&file_path) {
            return Err(StreamError::InvalidArgument(format!(
                "symbols file {} not found",
                file_path.display()
            )));
        }
        let file = File::open(&file_path)?;
        return SymbolList::parse_from_file(BufReader::new(file));
    }
    match &args.symbols {
        Some(raw) => raw.parse(),
        None => Err(StreamError::InvalidArgument(
            "either --symbols or --path is required".to_string(),
        )),
    }
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}
