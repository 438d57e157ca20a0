//! # Proof System Trait
//!
//! The abstract interface every value-proof backend satisfies. Backends are
//! `Send + Sync` and side-effect free: generation and verification are pure
//! functions of their inputs.

use thiserror::Error;
use tradeseal_binding::BindingTag;
use tradeseal_core::{Bytes32, ValidationError};

/// Error during proof generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// Request fields could not be decoded.
    #[error(transparent)]
    Malformed(#[from] ValidationError),

    /// The backend could not build a proof for this witness.
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
}

/// Error raised before verification is attempted. Cryptographic failure is
/// never an error; it is `Ok(false)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error(transparent)]
    Malformed(#[from] ValidationError),
}

/// The secret opening of a value commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueWitness {
    pub value: u64,
    pub blinding: Bytes32,
}

/// The secret opening of a transaction-hash commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxHashWitness {
    pub tx_hash: Bytes32,
    pub blinding: Bytes32,
}

/// A commitment together with the proof that it opens to an in-range value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueProof {
    pub commitment: Bytes32,
    pub proof: Vec<u8>,
}

/// A value-commitment proof backend.
pub trait ValueProofSystem: Send + Sync {
    /// Short identifier recorded alongside proofs this backend produces.
    fn name(&self) -> &'static str;

    /// Commit to `witness.value` and prove it lies in `[0, 2^64)`, absorbing
    /// `binding_tag` into the transcript when present.
    fn prove(
        &self,
        witness: &ValueWitness,
        binding_tag: Option<&BindingTag>,
    ) -> Result<ValueProof, ProofError>;

    /// Check `proof` against `commitment` under `binding_tag`. Undecodable
    /// proof bytes are simply invalid.
    fn verify(
        &self,
        commitment: &Bytes32,
        proof: &[u8],
        binding_tag: Option<&BindingTag>,
    ) -> bool;
}

/// A backend that hides transaction hashes behind commitments.
///
/// The buyer commits to the purchase and delivery transaction hashes under
/// one tx-hash binding tag, so a verifier holding that tag can tell that
/// both commitments belong to the same escrow without learning either hash.
/// Tag handling follows the value-proof rule table.
pub trait TxHashCommitmentSystem: Send + Sync {
    fn commit_tx_hash(
        &self,
        witness: &TxHashWitness,
        binding_tag: Option<&BindingTag>,
    ) -> Result<ValueProof, ProofError>;

    fn verify_tx_hash(
        &self,
        commitment: &Bytes32,
        proof: &[u8],
        binding_tag: Option<&BindingTag>,
    ) -> bool;
}
