use thiserror::Error;
use tradeseal_binding::BindingError;
use tradeseal_cas::CasError;
use tradeseal_core::{CanonicalizationError, ValidationError};
use tradeseal_zkp::ProofError;

#[derive(Error, Debug)]
pub enum VcError {
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("store error: {0}")]
    Store(#[from] CasError),

    #[error("credential is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binding context invalid: {0}")]
    Binding(#[from] BindingError),

    #[error("proof generation failed: {0}")]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// A `previousCredential` link points back into the chain.
    #[error("provenance cycle at {0}")]
    Cycle(String),

    #[error("provenance chain exceeds {0} links")]
    TooDeep(usize),
}
