//! # Validation Errors
//!
//! Structured errors raised by the validated constructors in this crate.
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations; higher layers convert them into their own error
//! surfaces (the API maps them to 422 responses).

use thiserror::Error;

/// Error raised when a domain primitive fails validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A file reference was empty or whitespace-only.
    #[error("file reference must not be empty")]
    EmptyFileReference,

    /// A file reference exceeded the maximum length.
    #[error("file reference must not exceed {max} characters (got {length})")]
    FileReferenceTooLong {
        /// Actual length of the rejected reference.
        length: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// A timestamp string could not be parsed as RFC 3339.
    #[error("invalid RFC 3339 timestamp {input:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        input: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// A Unix epoch value was outside the representable range.
    #[error("invalid Unix timestamp: {0}")]
    InvalidEpoch(i64),
}
