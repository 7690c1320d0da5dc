//! Decoding the solver's newline-delimited JSON progress stream.
//!
//! The solver prints one JSON object per line on standard output. Lines are
//! decoded independently: a malformed line produces a [`DecodeError`] and the
//! next line is decoded as usual. An unterminated line at end of stream is
//! dropped without error, since a killed or crashing solver may stop mid-line.
//!
//! - [`LineDecoder`] is the push-based core, fed arbitrary byte chunks.
//! - [`RecordReader`] wraps a blocking reader as an iterator.
//! - [`record_stream`] wraps an async reader as a `futures::Stream`.
//!
//! [`DecodeError`]: crate::error::DecodeError

mod decoder;
mod record;

pub use decoder::{DEFAULT_MAX_LINE_LEN, Decoded, LineDecoder, RecordReader, record_stream};
pub use record::ProgressRecord;
