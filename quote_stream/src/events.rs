//! Consumer-facing events.
//!
//! The core never calls into the consumer from a session thread. Everything the
//! consumer needs to know is sent as an immutable `ConsumerEvent` over an
//! unbounded channel, so a slow consumer never stalls a read loop and the
//! consumer can drain events on whichever thread owns its display state.

use crossbeam_channel::Receiver;
use quote_common::QuoteSnapshot;

use crate::session::{SessionId, TerminationReason};

/// Everything a consumer is told about its subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerEvent {
    /// A snapshot changed.
    Quote {
        /// Emitting session.
        session: SessionId,
        /// The symbol's updated snapshot.
        snapshot: QuoteSnapshot,
    },
    /// A session opened and was registered.
    SessionOpened {
        /// The new session.
        session: SessionId,
        /// Sessions open after registering it.
        open_sessions: usize,
    },
    /// A session ended and was removed from the registry.
    SessionClosed {
        /// The ended session.
        session: SessionId,
        /// Why it ended.
        reason: TerminationReason,
        /// Sessions open after removing it.
        open_sessions: usize,
    },
    /// The server rejected the token; nothing will be retried with it.
    AuthRejected {
        /// HTTP status of the rejection.
        status: u16,
    },
    /// A `start` ran out of attempts without opening a session.
    GaveUp {
        /// Attempts made.
        attempts: u32,
    },
    /// `stop` was requested while a `start` was still connecting; nothing
    /// was left open.
    StartCancelled {
        /// Attempts made before the stop was seen.
        attempts: u32,
    },
}

/// Callback-style view of `ConsumerEvent`s.
pub trait QuoteConsumer {
    /// A snapshot changed.
    fn on_quote(&mut self, snapshot: QuoteSnapshot);

    /// A session opened; `open_sessions` is the new live count.
    fn on_session_opened(&mut self, session: SessionId, open_sessions: usize);

    /// A session ended; `open_sessions` is the new live count.
    fn on_session_closed(
        &mut self,
        session: SessionId,
        reason: &TerminationReason,
        open_sessions: usize,
    );

    /// The token was rejected. A new token is needed before the next `start`.
    fn on_auth_rejected(&mut self, _status: u16) {}

    /// A `start` gave up after `attempts` failed opens.
    fn on_gave_up(&mut self, _attempts: u32) {}

    /// A pending `start` was abandoned because `stop` was requested.
    fn on_start_cancelled(&mut self, _attempts: u32) {}
}

impl ConsumerEvent {
    /// Hands the event to the matching callback.
    pub fn dispatch<C: QuoteConsumer + ?Sized>(self, consumer: &mut C) {
        match self {
            ConsumerEvent::Quote { snapshot, .. } => consumer.on_quote(snapshot),
            ConsumerEvent::SessionOpened {
                session,
                open_sessions,
            } => consumer.on_session_opened(session, open_sessions),
            ConsumerEvent::SessionClosed {
                session,
                reason,
                open_sessions,
            } => consumer.on_session_closed(session, &reason, open_sessions),
            ConsumerEvent::AuthRejected { status } => consumer.on_auth_rejected(status),
            ConsumerEvent::GaveUp { attempts } => consumer.on_gave_up(attempts),
            ConsumerEvent::StartCancelled { attempts } => consumer.on_start_cancelled(attempts),
        }
    }
}

/// Dispatches every event already queued without blocking; returns how many.
///
/// Meant for consumers that poll from their own loop (e.g. a UI tick).
pub fn drain<C: QuoteConsumer + ?Sized>(
    events: &Receiver<ConsumerEvent>,
    consumer: &mut C,
) -> usize {
    let mut handled = 0;
    for event in events.try_iter() {
        event.dispatch(consumer);
        handled += 1;
    }
    handled
}
