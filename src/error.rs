//! Error taxonomy.
//!
//! Each layer owns one enum. Decode and framing failures are kept apart so the
//! stream loop can skip a bad message while the snapshot channel abandons the
//! whole connection.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// A message body that does not parse as a well-formed tagged message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,
    #[error("unknown message tag 0x{0:02x}")]
    UnknownTag(u8),
    #[error("truncated {field}: need {need} bytes, got {got}")]
    Truncated {
        field: &'static str,
        need: usize,
        got: usize,
    },
    #[error("{0} trailing bytes after message end")]
    TrailingBytes(usize),
    #[error("invalid utf-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("expected tag 0x{expected:02x}, got 0x{got:02x}")]
    UnexpectedTag { expected: u8, got: u8 },
}

/// A value that cannot be represented in the wire layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{field} is {len} bytes, limit is 65535")]
    StringTooLong { field: &'static str, len: usize },
    #[error("{field} has {count} levels, limit is 65535")]
    TooManyLevels { field: &'static str, count: usize },
}

/// Length prefix and payload disagree on the snapshot channel.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("peer closed after {got} of {expected} bytes")]
    ShortRead { expected: usize, got: usize },
    #[error("declared frame length {0} exceeds limit {1}")]
    Oversized(u32, u32),
    #[error("frame i/o: {0}")]
    Io(#[from] io::Error),
}

/// Failures of the live subscription. All of them end the dashboard.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("invalid stream url {0}")]
    Url(String),
    #[error("connect to {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("handshake encode: {0}")]
    Handshake(#[from] serde_json::Error),
    #[error("stream transport: {0}")]
    Transport(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("stream closed by peer")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Transport(Box::new(err))
    }
}

/// Failures of a single depth-snapshot request. Never fatal.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot server {0} refused the connection")]
    Refused(SocketAddr),
    #[error("snapshot request timed out after {0:?}")]
    Timeout(Duration),
    #[error("cannot resolve snapshot endpoint {0}")]
    Resolve(String),
    #[error("snapshot i/o: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot request encode: {0}")]
    Encode(#[from] EncodeError),
    #[error("snapshot framing: {0}")]
    Framing(#[from] FramingError),
    #[error("snapshot decode: {0}")]
    Decode(#[from] DecodeError),
}

/// Command-line values that parse but cannot be used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--max-levels must be at least 1")]
    ZeroLevels,
    #[error("--snapshot-timeout-ms must be positive")]
    ZeroTimeout,
}

/// A draw call that could not be honoured. Caught and logged by the render
/// engine, never returned past it.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("row {row} ({key}) outside pad of {capacity} rows")]
    OutOfBounds {
        row: usize,
        key: String,
        capacity: usize,
    },
    #[error("terminal write: {0}")]
    Terminal(#[from] io::Error),
}
