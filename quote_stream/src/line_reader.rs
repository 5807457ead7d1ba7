//! Line framing over a streaming response body.
//!
//! `LineReader` turns any `BufRead` into a lazy sequence of text lines. The
//! sequence ends cleanly when the body is exhausted or when a sentinel line
//! arrives:
//! - a line ending with `END` (case-insensitive) — the server finished;
//! - a line containing `ERROR` (case-insensitive) — the server rejected the
//!   subscription.
//!
//! Sentinel lines are consumed but never yielded. Blank lines (chunk keep-alives)
//! are skipped. No read timeout is applied here: a quiet market can leave the
//! stream idle for hours. Line length is capped; a longer line is an
//! `InvalidData` error.

use std::io::{self, BufRead, ErrorKind, Read};

use log::trace;

const END_MARKER: &str = "END";
const ERROR_MARKER: &str = "ERROR";
/// Longest line accepted by default, terminator included.
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Why a `LineReader` stopped producing lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnd {
    /// The body reached end-of-data.
    Eof,
    /// The server sent its end-of-stream sentinel.
    EndMarker,
    /// The server sent its error sentinel.
    ErrorMarker,
}

/// Lazy line iterator over a streaming body.
///
/// Yields `io::Result<String>`; an I/O error is yielded once and ends the
/// sequence without setting `finished`.
pub struct LineReader<R> {
    reader: R,
    max_line: u64,
    buf: Vec<u8>,
    finished: Option<LineEnd>,
    failed: bool,
}

impl<R: BufRead> LineReader<R> {
    /// Wraps a buffered body reader.
    pub fn new(reader: R) -> Self {
        Self::with_max_line(reader, MAX_LINE_BYTES)
    }

    /// Wraps a buffered body reader, rejecting lines of `max_line` bytes or more
    /// that have no terminator yet.
    pub fn with_max_line(reader: R, max_line: u64) -> Self {
        LineReader {
            reader,
            max_line,
            buf: Vec::with_capacity(1024),
            finished: None,
            failed: false,
        }
    }

    /// How the sequence ended, once it has.
    pub fn finished(&self) -> Option<LineEnd> {
        self.finished
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buf.clear();
            let n = (&mut self.reader)
                .take(self.max_line)
                .read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                self.finished = Some(LineEnd::Eof);
                return Ok(None);
            }
            if n as u64 == self.max_line && self.buf.last() != Some(&b'\n') {
                return Err(io::Error::new(
                    ErrorKind::InvalidData,
                    format!("line exceeds {} bytes", self.max_line),
                ));
            }

            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end_matches(['\r', '\n']);
            trace!("stream line: {}", line);

            if line.trim().is_empty() {
                continue;
            }
            if let Some(end) = classify_sentinel(line) {
                self.finished = Some(end);
                return Ok(None);
            }
            return Ok(Some(line.to_string()));
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished.is_some() || self.failed {
            return None;
        }
        match self.read_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Classifies a sentinel line; `ERROR` wins when a line matches both markers.
pub fn classify_sentinel(line: &str) -> Option<LineEnd> {
    let upper = line.trim().to_ascii_uppercase();
    if upper.contains(ERROR_MARKER) {
        Some(LineEnd::ErrorMarker)
    } else if upper.ends_with(END_MARKER) {
        Some(LineEnd::EndMarker)
    } else {
        None
    }
}
