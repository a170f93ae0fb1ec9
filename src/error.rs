// src/error.rs
//
// =============================================================================
// DURALOG: ERROR HIERARCHY (v 0.1)
// =============================================================================
//
// Four kinds, matching the four failure modes named in the design: bad
// construction parameters, OS-level I/O failure, a wrong-shaped append
// input, and (logged, never returned by replay) frame corruption.

use std::io;
use std::path::PathBuf;

/// Errors surfaced across the public API.
#[derive(Debug, thiserror::Error)]
pub enum DuraLogError {
    /// Invalid or missing construction parameters. Raised synchronously from
    /// `DuraLog::open`; no instance is created.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Any OS-level failure during open, stat, write, flush, fsync, or the
    /// advisory lock. Carries the path and the underlying cause.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The value handed to `append_value` did not serialize to a JSON object
    /// or a string. Raised synchronously, before the value reaches the queue.
    #[error("programmer error: {0}")]
    Programmer(String),

    /// A frame failed integrity validation during replay: bad header, short
    /// payload, checksum mismatch, or an unparseable payload. Replay logs and
    /// skips these; this variant exists on the public enum for callers that
    /// want to construct or match on the full error surface, but `Replay`
    /// itself never returns it.
    #[error("corrupt frame in {path:?} at offset {offset}: {reason}")]
    Corruption {
        path: PathBuf,
        offset: u64,
        reason: String,
    },
}

impl DuraLogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DuraLogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Internal codec decode failure. Not part of the public API: the replay
/// reader turns every variant into a logged [`DuraLogError::Corruption`] and
/// moves on without returning it.
#[derive(Debug, thiserror::Error)]
pub(crate) enum DecodeError {
    #[error("incomplete header")]
    IncompleteHeader,
    #[error("short payload: expected {expected} bytes, got {actual}")]
    ShortPayload { expected: u32, actual: usize },
    #[error("implausible payload length: {0} bytes")]
    ImplausibleLength(u32),
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid UTF-8 payload: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("unknown type flag: {0:#04x}")]
    UnknownTypeFlag(u8),
    #[error("I/O error while decoding: {0}")]
    Io(#[from] io::Error),
}
