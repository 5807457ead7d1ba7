//! Network seam between sessions and the quote server.
//!
//! A session only needs two things from the network: a body to read lines from
//! and a way to abort that read from another thread. `StreamTransport` hands out
//! both as an `OpenStream`; `HttpTransport` is the real implementation and tests
//! plug in scripted ones.

mod http;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use quote_common::Result;
use url::Url;

pub use http::HttpTransport;

/// Aborts the read side of an open stream.
///
/// Closing must wake a thread blocked in a read on the stream's body; the read
/// then returns end-of-data or an error.
pub trait StreamCloser: Send + Sync {
    /// Releases the underlying connection. Safe to call more than once.
    fn close(&self);
}

/// An established stream: the response body plus its closer.
pub struct OpenStream {
    /// Response body with transfer framing already removed.
    pub body: Box<dyn BufRead + Send>,
    /// Handle that aborts reads on `body`.
    pub closer: Arc<dyn StreamCloser>,
}

/// Opens quote-change streams.
pub trait StreamTransport: Send + Sync {
    /// Establishes a stream for `url`, bounding the establishment by `timeout`.
    ///
    /// Once this returns, reads on the body wait without limit.
    fn open(&self, url: &Url, timeout: Duration) -> Result<OpenStream>;
}
