use thiserror::Error;
use tradeseal_core::{CanonicalizationError, ContentDigest};

#[derive(Error, Debug)]
pub enum CasError {
    #[error("no content stored at {0}")]
    NotFound(ContentDigest),

    /// Stored bytes no longer hash to their address.
    #[error("integrity violation: object {expected} hashes to {actual}")]
    Integrity {
        expected: ContentDigest,
        actual: ContentDigest,
    },

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
