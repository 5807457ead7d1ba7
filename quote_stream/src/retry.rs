//! Open-attempt state machine and the delay abstraction it sleeps through.
//!
//! ```text
//! Idle ──begin──▶ Connecting{n} ──opened──▶ Open ──closed──▶ Closed
//!                   │    ▲
//!            failed │    │ begin (n < max)
//!                   ▼    │
//!               (retry after delay)  ── n == max ──▶ Closed
//! ```
//!
//! The machine itself never sleeps; the controller asks it what to do and
//! waits through a `Delay`, so tests can swap wall-clock time for a recorder.

use std::thread;
use std::time::Duration;

use crate::config::RetryPolicy;

/// Something that can pause the calling thread.
pub trait Delay: Send + Sync {
    /// Blocks for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Real delay backed by `thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Connection lifecycle of one `start` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    /// Nothing attempted yet.
    Idle,
    /// Attempt `attempt` (1-based) is in flight.
    Connecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// A session opened.
    Open,
    /// Finished: the session ended, attempts ran out, or the token was rejected.
    Closed,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then begin the next attempt.
    RetryAfter(Duration),
    /// Attempts exhausted.
    GiveUp {
        /// Attempts made.
        attempts: u32,
    },
}

/// Bounded fixed-delay retry state machine.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: ConnectState,
    attempts: u32,
}

impl RetryMachine {
    /// New machine in `Idle`.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: ConnectState::Idle,
            attempts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectState {
        self.state
    }

    /// Attempts begun so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Starts the next attempt and returns its number, or `None` if the machine
    /// is not waiting to connect or the budget is spent.
    pub fn begin_attempt(&mut self) -> Option<u32> {
        let may_begin = matches!(self.state, ConnectState::Idle | ConnectState::Connecting { .. });
        if !may_begin || self.attempts >= self.policy.max_attempts {
            return None;
        }
        self.attempts += 1;
        self.state = ConnectState::Connecting {
            attempt: self.attempts,
        };
        Some(self.attempts)
    }

    /// Records a successful open.
    pub fn opened(&mut self) {
        self.state = ConnectState::Open;
    }

    /// Records a failed attempt and decides what comes next.
    pub fn failed(&mut self) -> RetryDecision {
        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectState::Closed;
            RetryDecision::GiveUp {
                attempts: self.attempts,
            }
        } else {
            RetryDecision::RetryAfter(self.policy.delay)
        }
    }

    /// Records a terminal outcome (session ended or credential rejected).
    pub fn closed(&mut self) {
        self.state = ConnectState::Closed;
    }
}
