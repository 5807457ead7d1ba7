//! In-memory transport and clock fakes for unit tests.

use std::collections::VecDeque;
use std::io::{self, BufReader, Cursor, ErrorKind, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, select, unbounded};
use quote_common::{Result, StreamError};
use url::Url;

use crate::retry::Delay;
use crate::transport::{OpenStream, StreamCloser, StreamTransport};

/// Scripted outcome of one `open` call.
pub(crate) enum Step {
    /// Establishment times out.
    Timeout,
    /// The server answers 401.
    Unauthorized,
    /// A finished body with this content.
    Body(&'static str),
    /// A body fed by the test until closed.
    Live(LiveBody),
    /// Signals `entered`, blocks until `release` fires, then opens with `body`.
    Held {
        entered: Sender<()>,
        release: Receiver<()>,
        body: &'static str,
    },
}

/// Transport that replays a script of open outcomes, one per call.
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    opens: AtomicUsize,
    closes: Arc<AtomicUsize>,
    urls: Mutex<Vec<Url>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        ScriptedTransport {
            steps: Mutex::new(steps.into()),
            opens: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Number of `open` calls made.
    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `close` calls on handed-out closers.
    pub(crate) fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }
}

impl StreamTransport for ScriptedTransport {
    fn open(&self, url: &Url, _timeout: Duration) -> Result<OpenStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Timeout);

        let counter = CountingCloser {
            closes: Arc::clone(&self.closes),
            inner: None,
        };
        match step {
            Step::Timeout => Err(StreamError::Connection("timed out connecting".into())),
            Step::Unauthorized => Err(StreamError::Auth { status: 401 }),
            Step::Body(text) => Ok(OpenStream {
                body: Box::new(Cursor::new(text.as_bytes().to_vec())),
                closer: Arc::new(counter),
            }),
            Step::Held {
                entered,
                release,
                body,
            } => {
                let _ = entered.send(());
                let _ = release.recv();
                Ok(OpenStream {
                    body: Box::new(Cursor::new(body.as_bytes().to_vec())),
                    closer: Arc::new(counter),
                })
            }
            Step::Live(live) => {
                let closer = live.closer();
                Ok(OpenStream {
                    body: Box::new(BufReader::new(live)),
                    closer: Arc::new(CountingCloser {
                        inner: Some(closer),
                        ..counter
                    }),
                })
            }
        }
    }
}

struct CountingCloser {
    closes: Arc<AtomicUsize>,
    inner: Option<LiveCloser>,
}

impl StreamCloser for CountingCloser {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(inner) = &self.inner {
            inner.close();
        }
    }
}

/// Body that blocks until the test feeds bytes or the stream is closed.
pub(crate) struct LiveBody {
    feed: Receiver<Vec<u8>>,
    close_rx: Receiver<()>,
    close_tx: Arc<Mutex<Option<Sender<()>>>>,
    pending: Vec<u8>,
}

impl LiveBody {
    fn closer(&self) -> LiveCloser {
        LiveCloser {
            close_tx: Arc::clone(&self.close_tx),
        }
    }
}

/// Creates a live body and the sender that feeds it.
pub(crate) fn live_body() -> (Sender<Vec<u8>>, LiveBody) {
    let (feed_tx, feed_rx) = unbounded();
    let (close_tx, close_rx) = unbounded();
    (
        feed_tx,
        LiveBody {
            feed: feed_rx,
            close_rx,
            close_tx: Arc::new(Mutex::new(Some(close_tx))),
            pending: Vec::new(),
        },
    )
}

impl Read for LiveBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pending.is_empty() {
            select! {
                recv(self.feed) -> bytes => match bytes {
                    Ok(bytes) => self.pending = bytes,
                    Err(_) => return Ok(0),
                },
                recv(self.close_rx) -> _ => {
                    return Err(io::Error::new(ErrorKind::ConnectionAborted, "stream closed"));
                }
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct LiveCloser {
    close_tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl LiveCloser {
    fn close(&self) {
        self.close_tx.lock().unwrap().take();
    }
}

/// Delay that records requested pauses instead of sleeping.
#[derive(Default)]
pub(crate) struct RecordingDelay {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingDelay {
    pub(crate) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Delay for RecordingDelay {
    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// Delay that reports each pause and blocks until the test releases it.
pub(crate) struct GatedDelay {
    sleeping: Sender<Duration>,
    wake: Receiver<()>,
}

/// Creates a gated delay, the receiver of its pauses and the sender that ends them.
pub(crate) fn gated_delay() -> (GatedDelay, Receiver<Duration>, Sender<()>) {
    let (sleeping_tx, sleeping_rx) = unbounded();
    let (wake_tx, wake_rx) = unbounded();
    (
        GatedDelay {
            sleeping: sleeping_tx,
            wake: wake_rx,
        },
        sleeping_rx,
        wake_tx,
    )
}

impl Delay for GatedDelay {
    fn sleep(&self, duration: Duration) {
        let _ = self.sleeping.send(duration);
        let _ = self.wake.recv();
    }
}
