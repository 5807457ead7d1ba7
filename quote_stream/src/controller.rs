//! Reconnect controller: session creation, bounded retry, registry and routing.
//!
//! `start` runs the attempt loop on its own thread:
//! - every failed open (argument, transport, timeout, non-auth HTTP status) is
//!   retried after the policy's fixed delay until the attempt budget is spent,
//!   then the controller gives up and emits `GaveUp`;
//! - an auth rejection stops immediately and emits `AuthRejected`: the same
//!   token is never retried;
//! - a successful open registers the session, emits `SessionOpened` and hands
//!   the session its own read thread.
//!
//! `stop` also reaches a `start` that is still connecting: the attempt loop
//! checks for it before every attempt and again before registering a freshly
//! opened session, which is then released instead of registered, and reports
//! `StartCancelled`.
//!
//! A router thread receives every session's events, removes closed sessions
//! from the registry and forwards everything to the consumer channel. A session
//! that opened and later ends is not reopened here; whether to call `start`
//! again belongs to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, error, info, warn};
use quote_common::{Result, StreamError, SymbolList};

use crate::config::StreamConfig;
use crate::events::ConsumerEvent;
use crate::registry::SessionRegistry;
use crate::retry::{Delay, RetryDecision, RetryMachine, ThreadDelay};
use crate::session::{Session, SessionEvent, SessionId, TerminationReason};
use crate::transport::{HttpTransport, StreamTransport};

/// Result of one `start` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A session opened and is streaming.
    Opened(SessionId),
    /// The token was rejected; no retry was made.
    AuthRejected {
        /// HTTP status of the rejection.
        status: u16,
    },
    /// Every attempt failed.
    GaveUp {
        /// Attempts made.
        attempts: u32,
    },
    /// `stop` was requested before a session could be registered.
    Cancelled {
        /// Attempts made.
        attempts: u32,
    },
}

struct Inner {
    config: StreamConfig,
    transport: Arc<dyn StreamTransport>,
    delay: Arc<dyn Delay>,
    registry: Arc<Mutex<SessionRegistry>>,
    /// Bumped by every `stop`; a start loop compares it with the value it began with.
    stop_generation: AtomicU64,
    session_tx: Sender<SessionEvent>,
    consumer_tx: Sender<ConsumerEvent>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        match self.registry.lock() {
            Ok(registry) => {
                let cancelled = registry.cancel_all();
                if cancelled > 0 {
                    debug!("Controller dropped, cancelled {} session(s)", cancelled);
                }
            }
            Err(e) => error!("Registry unavailable on shutdown: {}", e),
        }
    }
}

/// Opens quote streams with bounded retry and routes their output to one consumer.
///
/// Cheap to clone; clones share the registry and the consumer channel. Dropping
/// the last clone cancels every open session.
#[derive(Clone)]
pub struct ReconnectController {
    inner: Arc<Inner>,
}

impl ReconnectController {
    /// Controller using the real HTTP transport and wall-clock delays.
    ///
    /// Returns the controller and the receiver the consumer drains.
    pub fn new(config: StreamConfig) -> Result<(Self, Receiver<ConsumerEvent>)> {
        let transport = HttpTransport::new(config.user_agent.clone(), config.connect_timeout)?;
        Self::with_parts(config, Arc::new(transport), Arc::new(ThreadDelay))
    }

    /// Controller over an explicit transport and delay.
    pub fn with_parts(
        config: StreamConfig,
        transport: Arc<dyn StreamTransport>,
        delay: Arc<dyn Delay>,
    ) -> Result<(Self, Receiver<ConsumerEvent>)> {
        let (consumer_tx, consumer_rx) = unbounded();
        let (session_tx, session_rx) = unbounded();
        let registry = Arc::new(Mutex::new(SessionRegistry::new()));

        let router_registry = Arc::clone(&registry);
        let router_tx = consumer_tx.clone();
        thread::Builder::new()
            .name("quote-router".to_string())
            .spawn(move || {
                if let Err(e) = route_events(session_rx, router_registry, router_tx) {
                    error!("Event router stopped: {}", e);
                }
            })?;

        let controller = ReconnectController {
            inner: Arc::new(Inner {
                config,
                transport,
                delay,
                registry,
                stop_generation: AtomicU64::new(0),
                session_tx,
                consumer_tx,
            }),
        };
        Ok((controller, consumer_rx))
    }

    /// Starts a subscription to the comma-delimited `symbols` on a background thread.
    ///
    /// The returned handle yields the outcome once the attempt loop finishes; it
    /// may be dropped, as the outcome is also reported on the consumer channel.
    pub fn start(&self, symbols: &str, token: &str) -> Result<JoinHandle<StartOutcome>> {
        let controller = self.clone();
        let symbols = symbols.to_string();
        let token = token.to_string();
        let generation = self.generation();
        let handle = thread::Builder::new()
            .name("quote-connect".to_string())
            .spawn(move || controller.attempt_loop(&symbols, &token, generation))?;
        Ok(handle)
    }

    /// The attempt loop of `start`, run on the calling thread.
    pub fn connect(&self, symbols: &str, token: &str) -> StartOutcome {
        self.attempt_loop(symbols, token, self.generation())
    }

    fn attempt_loop(&self, symbols: &str, token: &str, generation: u64) -> StartOutcome {
        let symbols: SymbolList = match symbols.parse() {
            Ok(symbols) => symbols,
            Err(e) => {
                warn!("Unusable symbol list '{}': {}", symbols, e);
                SymbolList::default()
            }
        };
        let retry = self.inner.config.retry;
        let mut machine = RetryMachine::new(retry);

        loop {
            if self.stop_requested(generation) {
                return self.cancelled(&symbols, &mut machine);
            }
            let Some(attempt) = machine.begin_attempt() else {
                break;
            };
            match self.try_open(&symbols, token, generation) {
                Ok(Some(id)) => {
                    machine.opened();
                    return StartOutcome::Opened(id);
                }
                Ok(None) => return self.cancelled(&symbols, &mut machine),
                Err(StreamError::Auth { status }) => {
                    warn!("Stream for {} rejected the access token (HTTP {})", symbols, status);
                    machine.closed();
                    self.notify(ConsumerEvent::AuthRejected { status });
                    return StartOutcome::AuthRejected { status };
                }
                Err(e) => {
                    warn!(
                        "Open attempt {}/{} for {} failed: {}",
                        attempt, retry.max_attempts, symbols, e
                    );
                    match machine.failed() {
                        RetryDecision::RetryAfter(delay) => self.inner.delay.sleep(delay),
                        RetryDecision::GiveUp { .. } => break,
                    }
                }
            }
        }

        let attempts = machine.attempts();
        info!("Giving up on {} after {} attempt(s)", symbols, attempts);
        self.notify(ConsumerEvent::GaveUp { attempts });
        StartOutcome::GaveUp { attempts }
    }

    /// Cancels every open session and any `start` still connecting. Each open
    /// session reports `Cancelled` and is removed from the registry by the
    /// router. Returns how many open sessions were signalled.
    pub fn stop(&self) -> Result<usize> {
        self.inner.stop_generation.fetch_add(1, Ordering::SeqCst);
        let registry = self.inner.registry.lock()?;
        let cancelled = registry.cancel_all();
        info!("Stop requested, cancelling {} session(s)", cancelled);
        Ok(cancelled)
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> Result<usize> {
        Ok(self.inner.registry.lock()?.len())
    }

    fn generation(&self) -> u64 {
        self.inner.stop_generation.load(Ordering::SeqCst)
    }

    fn stop_requested(&self, generation: u64) -> bool {
        self.generation() != generation
    }

    fn cancelled(&self, symbols: &SymbolList, machine: &mut RetryMachine) -> StartOutcome {
        machine.closed();
        let attempts = machine.attempts();
        info!("Start for {} cancelled by stop after {} attempt(s)", symbols, attempts);
        self.notify(ConsumerEvent::StartCancelled { attempts });
        StartOutcome::Cancelled { attempts }
    }

    /// Opens and registers a session; `None` when `stop` came first.
    fn try_open(
        &self,
        symbols: &SymbolList,
        token: &str,
        generation: u64,
    ) -> Result<Option<SessionId>> {
        let session = Session::open(
            self.inner.transport.as_ref(),
            &self.inner.config,
            symbols,
            token,
        )?;
        let id = session.id();
        let canceller = session.canceller();

        // Checked under the registry lock: `stop` bumps the generation before
        // taking it, so a session registered here is always seen by that stop.
        let registered = {
            let mut registry = self.inner.registry.lock()?;
            if self.stop_requested(generation) {
                None
            } else {
                registry.insert(id, symbols.clone(), canceller.clone());
                Some(registry.len())
            }
        };
        let Some(open_sessions) = registered else {
            debug!("Stop requested while session {} was opening, releasing it", id);
            canceller.cancel();
            return Ok(None);
        };
        info!("Session {} opened for {} ({} open)", id, symbols, open_sessions);
        self.notify(ConsumerEvent::SessionOpened {
            session: id,
            open_sessions,
        });

        if let Err(e) = session.spawn(self.inner.session_tx.clone()) {
            canceller.cancel();
            let open_sessions = {
                let mut registry = self.inner.registry.lock()?;
                registry.remove(id);
                registry.len()
            };
            self.notify(ConsumerEvent::SessionClosed {
                session: id,
                reason: TerminationReason::ConnectionBroken(e.to_string()),
                open_sessions,
            });
            return Err(e);
        }
        Ok(Some(id))
    }

    fn notify(&self, event: ConsumerEvent) {
        if self.inner.consumer_tx.send(event).is_err() {
            debug!("Consumer channel closed, event dropped");
        }
    }
}

/// Forwards session events to the consumer, deregistering sessions as they close.
///
/// Runs until every session sender (the controller's included) is gone.
fn route_events(
    events: Receiver<SessionEvent>,
    registry: Arc<Mutex<SessionRegistry>>,
    consumer: Sender<ConsumerEvent>,
) -> Result<()> {
    for event in events {
        let forwarded = match event {
            SessionEvent::Quote { session, snapshot } => ConsumerEvent::Quote { session, snapshot },
            SessionEvent::Closed { session, reason } => {
                let open_sessions = {
                    let mut registry = registry.lock()?;
                    if !registry.remove(session) {
                        debug!("Session {} closed before it was registered", session);
                    }
                    registry.len()
                };
                ConsumerEvent::SessionClosed {
                    session,
                    reason,
                    open_sessions,
                }
            }
        };
        if consumer.send(forwarded).is_err() {
            debug!("Consumer channel closed, event dropped");
        }
    }
    debug!("Event router finished");
    Ok(())
}
