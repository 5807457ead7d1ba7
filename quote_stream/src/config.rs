//! Stream configuration.
//!
//! `StreamConfig` gathers the network location and the timing knobs of a
//! controller. Defaults follow the stream provider's limits: a 6 s bound on
//! establishing a connection, 10 open attempts spaced 250 ms apart, and fewer
//! than 30 symbols per stream.

use std::time::Duration;

use quote_common::net::{DEFAULT_CONNECT_TIMEOUT_MS, MAX_OPEN_ATTEMPTS, RETRY_DELAY_MS};
use quote_common::symbols::MAX_SYMBOLS;
use url::Url;

/// Fixed-delay retry policy for opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Pause between two consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_OPEN_ATTEMPTS,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

/// Settings shared by every session a controller opens.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Environment base, e.g. `https://sim-api.tradestation.com/v2`.
    pub base_url: Url,
    /// Bound on connect + TLS handshake + response head.
    pub connect_timeout: Duration,
    /// Open retry policy.
    pub retry: RetryPolicy,
    /// Exclusive cap on symbols per stream.
    pub max_symbols: usize,
    /// `User-Agent` header sent with the stream request.
    pub user_agent: String,
}

impl StreamConfig {
    /// Configuration with default limits against `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            retry: RetryPolicy::default(),
            max_symbols: MAX_SYMBOLS,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }

    /// Overrides the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Overrides the symbol cap.
    pub fn with_max_symbols(mut self, max_symbols: usize) -> Self {
        self.max_symbols = max_symbols;
        self
    }
}
