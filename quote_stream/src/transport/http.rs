//! Streaming GET over `reqwest`, bridged onto blocking session threads.
//!
//! The transport owns a small tokio runtime. `open` blocks the caller on it
//! until the response head arrives, bounded as a whole (DNS, connect, TLS
//! handshake, request, head) by the caller's timeout. After that a pump task
//! forwards body chunks into a channel the session thread reads as a plain
//! `BufRead`, with no timeout on the wait for the next chunk.
//!
//! Closing the stream signals the pump, which drops the response (and with it
//! the connection) and disconnects the channel, so a blocked read returns.

use std::io::{self, BufRead, ErrorKind, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Buf, Bytes};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info};
use quote_common::{Result, StreamError};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;
use url::{Position, Url};

use super::{OpenStream, StreamCloser, StreamTransport};

/// Media type the quote stream endpoint serves.
const STREAM_ACCEPT: &str = "application/vnd.tradestation.streams+json";
/// Runtime threads driving connections; sessions read on their own threads.
const IO_WORKERS: usize = 2;

/// Real transport: `http` or `https` (rustls) through a shared `reqwest::Client`.
pub struct HttpTransport {
    client: Client,
    runtime: Runtime,
}

impl HttpTransport {
    /// Builds a transport sending `user_agent` with each stream request.
    ///
    /// `connect_timeout` bounds the TCP connect inside every establishment; the
    /// per-call timeout given to `open` bounds the establishment as a whole.
    pub fn new(user_agent: impl Into<String>, connect_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(STREAM_ACCEPT));

        let client = Client::builder()
            .user_agent(user_agent.into())
            .default_headers(headers)
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true)
            // Streams are long-lived and one per connection: nothing to pool.
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| StreamError::Connection(format!("building HTTP client: {e}")))?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(IO_WORKERS)
            .thread_name("quote-http")
            .enable_all()
            .build()?;

        Ok(Self { client, runtime })
    }
}

impl StreamTransport for HttpTransport {
    fn open(&self, url: &Url, timeout: Duration) -> Result<OpenStream> {
        let response = self
            .runtime
            .block_on(async {
                tokio::time::timeout(timeout, self.client.get(url.clone()).send()).await
            })
            .map_err(|_| {
                StreamError::Connection(format!(
                    "timed out establishing stream after {} ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(request_error)?;

        check_status(response.status())?;
        debug!("Stream response {} ({:?})", response.status(), response.version());

        let (chunk_tx, chunk_rx) = unbounded();
        let (close_tx, close_rx) = oneshot::channel();
        self.runtime.spawn(pump(response, chunk_tx, close_rx));

        info!(
            "Stream established to {}",
            &url[Position::BeforeScheme..Position::AfterPath]
        );
        Ok(OpenStream {
            body: Box::new(ChannelBody::new(chunk_rx)),
            closer: Arc::new(PumpCloser {
                signal: Mutex::new(Some(close_tx)),
            }),
        })
    }
}

/// Maps the response status: 2xx passes, 401/403 reject the token.
fn check_status(status: StatusCode) -> Result<()> {
    match status {
        status if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            Err(StreamError::Auth {
                status: status.as_u16(),
            })
        }
        status if status.is_success() => Ok(()),
        status => Err(StreamError::Http {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        }),
    }
}

/// Request URLs carry the access token; keep them out of error text.
fn request_error(e: reqwest::Error) -> StreamError {
    if e.is_timeout() {
        StreamError::Connection("timed out connecting".to_string())
    } else if e.is_connect() {
        StreamError::Connection(format!("connecting: {}", e.without_url()))
    } else {
        StreamError::Connection(format!("request failed: {}", e.without_url()))
    }
}

/// Moves body chunks from the response into the session's channel until the
/// body ends, fails, nobody reads any more, or the stream is closed.
async fn pump(
    mut response: Response,
    chunks: Sender<io::Result<Bytes>>,
    mut closed: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut closed => {
                debug!("Stream body closed by owner");
                break;
            }
            next = response.chunk() => match next {
                Ok(Some(bytes)) => {
                    if chunks.send(Ok(bytes)).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let err = io::Error::new(ErrorKind::ConnectionAborted, e.without_url());
                    let _ = chunks.send(Err(err));
                    break;
                }
            }
        }
    }
}

/// Signals the pump to drop the response.
struct PumpCloser {
    signal: Mutex<Option<oneshot::Sender<()>>>,
}

impl StreamCloser for PumpCloser {
    fn close(&self) {
        match self.signal.lock() {
            Ok(mut signal) => {
                if let Some(tx) = signal.take() {
                    let _ = tx.send(());
                }
            }
            Err(e) => debug!("Stream closer poisoned: {}", e),
        }
    }
}

/// Blocking reader over chunks delivered by the pump.
///
/// A disconnected channel is end-of-data; an error chunk is returned once.
struct ChannelBody {
    chunks: Receiver<io::Result<Bytes>>,
    current: Bytes,
}

impl ChannelBody {
    fn new(chunks: Receiver<io::Result<Bytes>>) -> Self {
        ChannelBody {
            chunks,
            current: Bytes::new(),
        }
    }
}

impl BufRead for ChannelBody {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.current.is_empty() {
            match self.chunks.recv() {
                Ok(Ok(bytes)) => self.current = bytes,
                Ok(Err(e)) => return Err(e),
                Err(_) => break,
            }
        }
        Ok(&self.current[..])
    }

    fn consume(&mut self, amt: usize) {
        self.current.advance(amt.min(self.current.len()));
    }
}

impl Read for ChannelBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}
