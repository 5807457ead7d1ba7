//! Bookkeeping of currently open sessions.
//!
//! The registry is shared between the controller (which registers sessions as
//! they open) and the event router (which removes them as they close). Callers
//! wrap it in a `Mutex` so both sides amend it one at a time.

use std::collections::HashMap;
use std::time::Instant;

use quote_common::SymbolList;

use crate::session::{SessionCanceller, SessionId};

struct SessionEntry {
    symbols: SymbolList,
    canceller: SessionCanceller,
    opened_at: Instant,
}

/// Set of open sessions keyed by id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, SessionEntry>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an open session.
    pub fn insert(&mut self, id: SessionId, symbols: SymbolList, canceller: SessionCanceller) {
        self.sessions.insert(
            id,
            SessionEntry {
                symbols,
                canceller,
                opened_at: Instant::now(),
            },
        );
    }

    /// Forgets a session; returns `false` if it was not registered.
    pub fn remove(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(entry) => {
                log::debug!(
                    "Session {} ({}) deregistered after {:?}",
                    id,
                    entry.symbols,
                    entry.opened_at.elapsed()
                );
                true
            }
            None => false,
        }
    }

    /// `true` if `id` is registered.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// `true` with no open sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Cancels every registered session and returns how many were signalled.
    ///
    /// Entries stay registered until each session reports its close.
    pub fn cancel_all(&self) -> usize {
        for entry in self.sessions.values() {
            entry.canceller.cancel();
        }
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::session::Session;
    use crate::testing::{ScriptedTransport, Step};
    use url::Url;

    #[test]
    fn insert_remove_and_cancel() {
        let transport = ScriptedTransport::new(vec![Step::Body("END\r\n"), Step::Body("END\r\n")]);
        let config = StreamConfig::new(Url::parse("http://quotes.test").unwrap());
        let symbols: SymbolList = "MSFT".parse().unwrap();
        let a = Session::open(&transport, &config, &symbols, "t").unwrap();
        let b = Session::open(&transport, &config, &symbols, "t").unwrap();

        let mut registry = SessionRegistry::new();
        registry.insert(a.id(), symbols.clone(), a.canceller());
        registry.insert(b.id(), symbols.clone(), b.canceller());
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.cancel_all(), 2);
        assert!(a.canceller().is_cancelled());
        assert_eq!(transport.closes(), 2);
        assert_eq!(registry.len(), 2);

        assert!(registry.remove(a.id()));
        assert!(!registry.remove(a.id()));
        assert!(registry.contains(b.id()));
        assert_eq!(registry.len(), 1);
    }
}
