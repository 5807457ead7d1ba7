//! Console rendering of the quote board.
//!
//! `ConsoleBoard` is the client's consumer: it merges each snapshot into a
//! `QuoteBoard` and logs it, and it tracks whether anything is still streaming
//! so the main loop knows when to exit.
use chrono::Local;
use log::{error, info, warn};
use quote_common::QuoteSnapshot;
use quote_stream::{QuoteBoard, QuoteConsumer, SessionId, TerminationReason};

/// Quote board that logs every update.
#[derive(Debug, Default)]
pub struct ConsoleBoard {
    board: QuoteBoard,
    done: bool,
}

impl ConsoleBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once nothing is open and no attempt is pending.
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn board(&self) -> &QuoteBoard {
        &self.board
    }
}

impl QuoteConsumer for ConsoleBoard {
    fn on_quote(&mut self, snapshot: QuoteSnapshot) {
        match snapshot.to_json() {
            Ok(json) => info!("{} QUOTE {}", Local::now().format("%H:%M:%S%.3f"), json),
            Err(e) => error!("Failed to encode quote for {}: {}", snapshot.symbol, e),
        }
        self.board.on_quote(snapshot);
    }

    fn on_session_opened(&mut self, session: SessionId, open_sessions: usize) {
        self.board.on_session_opened(session, open_sessions);
    }

    fn on_session_closed(
        &mut self,
        session: SessionId,
        reason: &TerminationReason,
        open_sessions: usize,
    ) {
        self.board.on_session_closed(session, reason, open_sessions);
        if open_sessions == 0 {
            self.done = true;
        }
    }

    fn on_auth_rejected(&mut self, status: u16) {
        self.board.on_auth_rejected(status);
        self.done = true;
    }

    fn on_gave_up(&mut self, attempts: u32) {
        warn!("No stream could be opened after {} attempts", attempts);
        self.done = true;
    }

    fn on_start_cancelled(&mut self, attempts: u32) {
        info!("Subscription abandoned after {} attempt(s)", attempts);
        self.done = true;
    }
}
