//! Error types shared by the streaming core and its consumers.
//!
//! The `StreamError` enum covers the whole failure taxonomy of a quote stream:
//! argument validation, transport failures, HTTP status rejections, frame
//! decoding and lock poisoning between session threads.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type for opening and driving quote streams.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Caller supplied arguments that can never succeed (e.g. too many symbols).
    /// Raised before any network activity.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport-level failure while establishing the stream, including the
    /// connect timeout expiring.
    #[error("Connection error: {0}")]
    Connection(String),

    /// I/O error originating from sockets.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server rejected the access token (HTTP 401/403).
    #[error("Authentication rejected with HTTP status {status}")]
    Auth {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// Any other non-success HTTP status on the stream request.
    #[error("HTTP error {status}: {reason}")]
    Http {
        /// HTTP status code returned by the server.
        status: u16,
        /// Reason phrase from the status line.
        reason: String,
    },

    /// A frame could not be decoded. Never surfaced past the decoder.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The configured base URL or a derived stream URL is malformed.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Error indicating a poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),
}

impl StreamError {
    /// `true` when the server refused the credential; such failures must not be
    /// retried with the same token.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, StreamError::Auth { .. })
    }

    /// `true` when another open attempt with the same arguments may be made.
    pub fn is_retryable(&self) -> bool {
        !self.is_auth_failure()
    }
}

impl<T> From<PoisonError<T>> for StreamError {
    fn from(err: PoisonError<T>) -> Self {
        StreamError::MutexLock(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_is_the_only_non_retryable_error() {
        assert!(!StreamError::Auth { status: 401 }.is_retryable());
        assert!(StreamError::InvalidArgument("x".into()).is_retryable());
        assert!(StreamError::Connection("timed out".into()).is_retryable());
        assert!(
            StreamError::Http {
                status: 503,
                reason: "Service Unavailable".into()
            }
            .is_retryable()
        );
    }
}
