//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::dictionary::Token;

/// Convenient result type used throughout the crate.
pub type Result<T, E = TokmineError> = std::result::Result<T, E>;

/// Domain-specific error describing failures during configuration, IO, or
/// tokenization/mining operations.
#[derive(Debug, Error)]
pub enum TokmineError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// An input line could not be decoded as a record or token vector.
    #[error("parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number of the offending input line.
        line: u64,
        /// Human-readable description of what failed to decode.
        reason: String,
    },
    /// The token dictionary file was missing, unreadable, or corrupt when it
    /// was required.
    #[error("cannot load token dictionary {path:?}: {reason}")]
    DictionaryLoad {
        /// Path of the dictionary file.
        path: PathBuf,
        /// Description of the load failure.
        reason: String,
    },
    /// A vector referenced a token absent from the loaded dictionary.
    #[error("token {0} is not present in the dictionary")]
    UnknownToken(Token),
    /// Mining input contained vectors of differing lengths.
    #[error("vector {index} has length {found}, expected {expected}")]
    MismatchedLength {
        /// Position of the offending vector in the input batch.
        index: usize,
        /// Length of every preceding vector.
        expected: usize,
        /// Length actually observed.
        found: usize,
    },
    /// A token vector with an odd number of entries cannot be paired into
    /// key/value fields.
    #[error("token vector has odd length {0}; expected interleaved key/value pairs")]
    OddLengthVector(usize),
}

impl TokmineError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Helper constructor for parse failures at a known input line.
    pub fn parse(line: u64, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}
