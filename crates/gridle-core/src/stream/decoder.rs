//! Line buffering and per-line decoding.

use std::collections::VecDeque;
use std::io::{self, Read};

use futures::Stream;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::DecodeError;

use super::ProgressRecord;
use super::record::WireRecord;

/// One item of the decoded sequence.
pub type Decoded = Result<ProgressRecord, DecodeError>;

/// Read size for the reader adapters.
const CHUNK_SIZE: usize = 8 * 1024;

/// Longest line the decoder will buffer.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;

/// Bytes of an overlong line kept in its [`DecodeError`].
const PREVIEW_LEN: usize = 80;

/// Push-based NDJSON decoder.
///
/// Bytes are buffered until a newline completes a line; each completed line
/// is decoded on its own. A line longer than the maximum is reported once as
/// a [`DecodeError`] and the rest of it is skipped.
#[derive(Debug)]
pub struct LineDecoder {
    /// Bytes of the current, unterminated line.
    buffer: Vec<u8>,
    /// Lines completed so far, blank lines included.
    lines: usize,
    max_line_len: usize,
    /// The current line overflowed and was already reported.
    skipping: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            lines: 0,
            max_line_len,
            skipping: false,
        }
    }

    /// Feed a chunk and return the items for every line it completes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Decoded> {
        let mut decoded = Vec::new();
        let mut rest = bytes;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = (&rest[..pos], &rest[pos + 1..]);
            rest = tail;
            if self.skipping {
                self.skipping = false;
                self.lines += 1;
                continue;
            }
            if let Some(err) = self.append(head) {
                decoded.push(Err(err));
                self.skipping = false;
                self.lines += 1;
                continue;
            }
            let line = std::mem::take(&mut self.buffer);
            if let Some(item) = self.decode_line(&line) {
                decoded.push(item);
            }
        }
        if !self.skipping
            && let Some(err) = self.append(rest)
        {
            decoded.push(Err(err));
        }
        decoded
    }

    /// End of stream. Any unterminated line is dropped.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            tracing::trace!(
                "Discarding {} bytes of unterminated output",
                self.buffer.len()
            );
            self.buffer.clear();
        }
        self.skipping = false;
    }

    /// Number of buffered bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer part of the current line, or report it as overlong.
    fn append(&mut self, bytes: &[u8]) -> Option<DecodeError> {
        if self.buffer.len() + bytes.len() <= self.max_line_len {
            self.buffer.extend_from_slice(bytes);
            return None;
        }

        self.buffer.extend_from_slice(&bytes[..bytes.len().min(PREVIEW_LEN)]);
        let preview = &self.buffer[..self.buffer.len().min(PREVIEW_LEN)];
        let err = DecodeError {
            line: self.lines + 1,
            content: String::from_utf8_lossy(preview).into_owned(),
            reason: format!("line exceeds {} bytes", self.max_line_len),
        };
        self.buffer.clear();
        self.skipping = true;
        Some(err)
    }

    fn decode_line(&mut self, line: &[u8]) -> Option<Decoded> {
        self.lines += 1;
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.iter().all(u8::is_ascii_whitespace) {
            return None;
        }

        let decoded = serde_json::from_slice::<WireRecord>(line)
            .map_err(|e| e.to_string())
            .and_then(ProgressRecord::try_from)
            .map_err(|reason| DecodeError {
                line: self.lines,
                content: String::from_utf8_lossy(line).into_owned(),
                reason,
            });
        Some(decoded)
    }
}

/// Lazy iterator of records over a blocking reader.
///
/// Single pass: once the reader reports end of stream the iterator is done.
/// A read error other than `Interrupted` also ends the sequence.
pub struct RecordReader<R> {
    reader: R,
    chunk: Box<[u8]>,
    decoder: LineDecoder,
    ready: VecDeque<Decoded>,
    done: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            decoder: LineDecoder::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Decoded;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.done {
                return None;
            }
            match self.reader.read(&mut self.chunk) {
                Ok(0) => {
                    self.decoder.finish();
                    self.done = true;
                }
                Ok(n) => self.ready.extend(self.decoder.feed(&self.chunk[..n])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Progress stream read failed: {}", e);
                    self.decoder.finish();
                    self.done = true;
                }
            }
        }
    }
}

struct StreamState<R> {
    reader: R,
    chunk: Box<[u8]>,
    decoder: LineDecoder,
    ready: VecDeque<Decoded>,
    done: bool,
}

/// Lazy stream of records over an async reader, such as a child's stdout.
pub fn record_stream<R>(reader: R) -> impl Stream<Item = Decoded>
where
    R: AsyncRead + Unpin,
{
    let state = StreamState {
        reader,
        chunk: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
        decoder: LineDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.reader.read(&mut state.chunk).await {
                Ok(0) => {
                    state.decoder.finish();
                    state.done = true;
                }
                Ok(n) => {
                    let items = state.decoder.feed(&state.chunk[..n]);
                    state.ready.extend(items);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("Progress stream read failed: {}", e);
                    state.decoder.finish();
                    state.done = true;
                }
            }
        }
    })
}
