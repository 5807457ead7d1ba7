//! One streaming connection and its decode/merge pipeline.
//!
//! `Session::open` validates the request, establishes the stream and returns an
//! idle session. `Session::spawn` moves it onto its own thread, where the read
//! loop drives Line Reader → Frame Decoder → Snapshot Builder and sends every
//! emitted snapshot to the owner's channel. When the loop stops, for whatever
//! reason, the connection is released and exactly one `SessionEvent::Closed` is
//! sent.
//!
//! Cancellation goes through `SessionCanceller`: it flags the session and shuts
//! the connection down, which wakes a blocked read so the loop observes
//! `Cancelled` promptly.

use std::fmt;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use quote_common::net::quote_changes_url;
use quote_common::{QuoteSnapshot, Result, SymbolList};

use crate::config::StreamConfig;
use crate::decoder::decode_fragment;
use crate::line_reader::{LineEnd, LineReader};
use crate::snapshot::SnapshotBuilder;
use crate::transport::{OpenStream, StreamCloser, StreamTransport};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a session's read loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The server sent its END sentinel.
    NormalEnd,
    /// The server sent its ERROR sentinel (e.g. unknown symbol).
    SymbolError,
    /// The transport failed or the server closed without END.
    ConnectionBroken(String),
    /// The owner cancelled the session.
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::NormalEnd => f.write_str("normal end"),
            TerminationReason::SymbolError => f.write_str("symbol error"),
            TerminationReason::ConnectionBroken(detail) => {
                write!(f, "connection broken: {detail}")
            }
            TerminationReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// What a running session reports to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A snapshot updated by the latest fragment.
    Quote {
        /// Emitting session.
        session: SessionId,
        /// Updated snapshot.
        snapshot: QuoteSnapshot,
    },
    /// The session ended; sent exactly once, last.
    Closed {
        /// Ending session.
        session: SessionId,
        /// Why it ended.
        reason: TerminationReason,
    },
}

/// Cloneable handle that cancels one session from any thread.
#[derive(Clone)]
pub struct SessionCanceller {
    cancelled: Arc<AtomicBool>,
    closer: Arc<dyn StreamCloser>,
}

impl SessionCanceller {
    /// Flags the session as cancelled and releases its connection.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.closer.close();
    }

    /// `true` once `cancel` has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for SessionCanceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCanceller")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// An established stream not yet being read.
pub struct Session {
    id: SessionId,
    symbols: SymbolList,
    body: Box<dyn BufRead + Send>,
    canceller: SessionCanceller,
}

impl Session {
    /// Validates `symbols` and opens the quote-change stream for them.
    ///
    /// Fails with `InvalidArgument` before touching the network when the list is
    /// empty or holds `config.max_symbols` or more entries.
    pub fn open(
        transport: &dyn StreamTransport,
        config: &StreamConfig,
        symbols: &SymbolList,
        token: &str,
    ) -> Result<Session> {
        symbols.validate(config.max_symbols)?;
        let url = quote_changes_url(&config.base_url, symbols, token)?;
        let OpenStream { body, closer } = transport.open(&url, config.connect_timeout)?;

        Ok(Session {
            id: SessionId::next(),
            symbols: symbols.clone(),
            body,
            canceller: SessionCanceller {
                cancelled: Arc::new(AtomicBool::new(false)),
                closer,
            },
        })
    }

    /// This session's id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Symbols this session streams.
    pub fn symbols(&self) -> &SymbolList {
        &self.symbols
    }

    /// A handle that can cancel this session later.
    pub fn canceller(&self) -> SessionCanceller {
        self.canceller.clone()
    }

    /// Runs the read loop on a dedicated thread.
    pub fn spawn(self, events: Sender<SessionEvent>) -> Result<JoinHandle<TerminationReason>> {
        let handle = thread::Builder::new()
            .name(format!("quote-session-{}", self.id.get()))
            .spawn(move || self.run(&events))?;
        Ok(handle)
    }

    /// Runs the read loop on the calling thread until the stream terminates.
    pub fn run(self, events: &Sender<SessionEvent>) -> TerminationReason {
        let Session {
            id,
            symbols,
            body,
            canceller,
        } = self;
        debug!("Session {} reading quotes for {}", id, symbols);

        let reason = read_loop(id, body, &canceller, events);
        canceller.closer.close();
        info!("Session {} closed: {}", id, reason);

        if events
            .send(SessionEvent::Closed {
                session: id,
                reason: reason.clone(),
            })
            .is_err()
        {
            debug!("Session {} owner gone before close notification", id);
        }
        reason
    }
}

fn read_loop(
    id: SessionId,
    body: Box<dyn BufRead + Send>,
    canceller: &SessionCanceller,
    events: &Sender<SessionEvent>,
) -> TerminationReason {
    let mut lines = LineReader::new(body);
    let mut builder = SnapshotBuilder::new();

    for line in lines.by_ref() {
        if canceller.is_cancelled() {
            return TerminationReason::Cancelled;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                if canceller.is_cancelled() {
                    return TerminationReason::Cancelled;
                }
                warn!("Session {} read failed: {}", id, e);
                return TerminationReason::ConnectionBroken(e.to_string());
            }
        };

        let fragment = decode_fragment(&line);
        if let Some(snapshot) = builder.apply(&fragment) {
            if events
                .send(SessionEvent::Quote {
                    session: id,
                    snapshot,
                })
                .is_err()
            {
                debug!("Session {} has no listener left", id);
                return TerminationReason::Cancelled;
            }
        }
    }

    if canceller.is_cancelled() {
        return TerminationReason::Cancelled;
    }
    match lines.finished() {
        Some(LineEnd::EndMarker) => TerminationReason::NormalEnd,
        Some(LineEnd::ErrorMarker) => TerminationReason::SymbolError,
        Some(LineEnd::Eof) | None => {
            TerminationReason::ConnectionBroken("server closed the stream without END".to_string())
        }
    }
}
