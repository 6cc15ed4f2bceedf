//! Error types for the data engine.
//!
//! The file store and the realtime buffer report through the same enum but are
//! independent failure domains: a corrupt recording never touches a running
//! realtime session.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the record codec, file store, realtime buffer,
/// window manager and downsampler.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Opening or mapping a recording failed, or its size is not a whole
    /// number of records.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A record could not be decoded. Nothing of it is interpreted.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// Index outside the valid range (precondition violation).
    #[error("index {index} out of range (len {len})")]
    Index { index: usize, len: usize },

    /// Realtime append with a timestamp older than the last one stored.
    #[error("out-of-order sample for '{parameter}': timestamp {timestamp} < last {last}")]
    Order {
        parameter: String,
        timestamp: i64,
        last: i64,
    },

    /// Zero or negative budgets, durations, point caps, unknown units or
    /// parameters.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
