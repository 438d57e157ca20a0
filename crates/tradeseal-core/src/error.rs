//! # Error Types
//!
//! Every rejected operation in the system falls into one of four kinds.
//! Crate-level error enums map onto [`ErrorKind`] so callers (the HTTP
//! surface, the CLI) can classify a failure without matching on every
//! variant. A failed proof verification is not an error: verifiers return
//! `false`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a rejected operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// Operation not allowed in the current lifecycle state.
    State,
    /// Caller lacks the role the operation requires.
    Authorization,
    /// Value sent does not match what the operation requires.
    Funds,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::State => "state",
            Self::Authorization => "authorization",
            Self::Funds => "funds",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input validation failure for primitive types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field was not valid hexadecimal.
    #[error("{field} is not valid hex: {reason}")]
    InvalidHex {
        field: &'static str,
        reason: String,
    },

    /// A field decoded to the wrong number of bytes.
    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Mixed-case address whose casing does not match its EIP-55 checksum.
    #[error("address checksum mismatch: {0}")]
    BadChecksum(String),

    /// Numeric field outside its permitted range.
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    /// A field that must carry content was empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// A field was syntactically malformed.
    #[error("malformed {field}: {reason}")]
    Malformed {
        field: &'static str,
        reason: String,
    },
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Floats have no single canonical JCS rendering; amounts are decimal
    /// strings or integers.
    #[error("float values are not permitted in canonical documents: {0}")]
    FloatRejected(f64),

    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
