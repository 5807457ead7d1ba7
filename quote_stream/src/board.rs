//! Consumer-owned display state: one row per symbol.

use indexmap::IndexMap;
use log::{info, warn};
use quote_common::QuoteSnapshot;

use crate::events::QuoteConsumer;
use crate::session::{SessionId, TerminationReason};

/// Upsert collection of the latest snapshot per symbol plus the live session count.
///
/// Rows keep the order in which symbols first appeared.
#[derive(Debug, Default)]
pub struct QuoteBoard {
    rows: IndexMap<String, QuoteSnapshot>,
    open_sessions: usize,
    auth_rejected: Option<u16>,
}

impl QuoteBoard {
    /// Empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the row for the snapshot's symbol, or appends a new one.
    pub fn upsert(&mut self, snapshot: QuoteSnapshot) {
        match self.rows.get_mut(&snapshot.symbol) {
            Some(row) => *row = snapshot,
            None => {
                self.rows.insert(snapshot.symbol.clone(), snapshot);
            }
        }
    }

    /// Row for `symbol`.
    pub fn get(&self, symbol: &str) -> Option<&QuoteSnapshot> {
        self.rows.get(symbol)
    }

    /// Rows in display order.
    pub fn rows(&self) -> impl Iterator<Item = &QuoteSnapshot> {
        self.rows.values()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` with no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last reported number of open sessions.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions
    }

    /// HTTP status of the last token rejection, cleared when a session opens.
    pub fn auth_rejected(&self) -> Option<u16> {
        self.auth_rejected
    }
}

impl QuoteConsumer for QuoteBoard {
    fn on_quote(&mut self, snapshot: QuoteSnapshot) {
        self.upsert(snapshot);
    }

    fn on_session_opened(&mut self, session: SessionId, open_sessions: usize) {
        info!("Session {} opened ({} open)", session, open_sessions);
        self.open_sessions = open_sessions;
        self.auth_rejected = None;
    }

    fn on_session_closed(
        &mut self,
        session: SessionId,
        reason: &TerminationReason,
        open_sessions: usize,
    ) {
        info!("Session {} closed: {} ({} open)", session, reason, open_sessions);
        self.open_sessions = open_sessions;
    }

    fn on_auth_rejected(&mut self, status: u16) {
        warn!("Access token rejected (HTTP {})", status);
        self.auth_rejected = Some(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ConsumerEvent, drain};
    use crossbeam_channel::unbounded;

    fn quote(symbol: &str, bid: f64) -> QuoteSnapshot {
        QuoteSnapshot {
            symbol: symbol.to_string(),
            bid: Some(bid),
            ..QuoteSnapshot::default()
        }
    }

    #[test]
    fn upsert_replaces_existing_and_appends_new() {
        let mut board = QuoteBoard::new();
        board.upsert(quote("MSFT", 10.0));
        board.upsert(quote("GOOG", 500.0));
        board.upsert(quote("MSFT", 10.5));

        let rows: Vec<(&str, Option<f64>)> =
            board.rows().map(|r| (r.symbol.as_str(), r.bid)).collect();
        assert_eq!(rows, vec![("MSFT", Some(10.5)), ("GOOG", Some(500.0))]);
    }

    #[test]
    fn drains_events_into_board() {
        let (tx, rx) = unbounded();
        let session = SessionId::next();
        tx.send(ConsumerEvent::SessionOpened { session, open_sessions: 1 }).unwrap();
        tx.send(ConsumerEvent::Quote { session, snapshot: quote("MSFT", 1.0) }).unwrap();
        tx.send(ConsumerEvent::SessionClosed {
            session,
            reason: TerminationReason::NormalEnd,
            open_sessions: 0,
        })
        .unwrap();
        tx.send(ConsumerEvent::AuthRejected { status: 401 }).unwrap();

        let mut board = QuoteBoard::new();
        assert_eq!(drain(&rx, &mut board), 4);
        assert_eq!(board.len(), 1);
        assert_eq!(board.open_sessions(), 0);
        assert_eq!(board.auth_rejected(), Some(401));
    }
}
