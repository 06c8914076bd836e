//! Error types for the crate
//!
//! Provides unified error handling using thiserror. Absence of a key is never
//! an error: lookups report it as `None`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Error Enum ==
/// Unified error type for caches, decoders and file-backed containers.
#[derive(Error, Debug)]
pub enum Error {
    /// The cache was closed (explicitly or by dropping its last handle)
    #[error("cache is closed")]
    Closed,

    /// No Tokio runtime was available to host the eviction task
    #[error("no Tokio runtime available to run the eviction task")]
    NoRuntime,

    /// Rejected construction parameters
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stat or read failure on a backing file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failure reading a JSON stream
    #[error("failed to read JSON input: {0}")]
    Read(#[source] io::Error),

    /// Malformed JSON content
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input ended in the middle of a value
    #[error("unexpected end of JSON input")]
    UnexpectedEof,

    /// A well-formed token appeared where another was required
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: &'static str, found: String },

    /// A byte that cannot start any JSON token
    #[error("invalid character {found:?} at offset {offset}")]
    Syntax { offset: usize, found: char },

    /// Positional access past the end of a list
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::Closed.to_string(), "cache is closed");
        assert_eq!(
            Error::IndexOutOfRange { index: 3, len: 2 }.to_string(),
            "index 3 out of range for length 2"
        );
        assert_eq!(
            Error::Syntax { offset: 4, found: 'x' }.to_string(),
            "invalid character 'x' at offset 4"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
