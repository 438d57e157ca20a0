//! # tradeseal-zkp — Value Commitment Proofs
//!
//! A value proof shows that a commitment opens to a 64-bit value without
//! revealing it. Proofs here are **binding-aware**: when a
//! [`BindingTag`](tradeseal_binding::BindingTag) is supplied at generation,
//! the prover absorbs it into the transcript, and the proof verifies only
//! when the verifier supplies the identical tag.
//!
//! ## Verification rule
//!
//! | proof generated | verified with | result  |
//! |-----------------|---------------|---------|
//! | with tag `t`    | `t`           | `true`  |
//! | with tag `t`    | `t' != t`     | `false` |
//! | with tag `t`    | no tag        | `false` |
//! | without tag     | no tag        | `true`  |
//! | without tag     | any tag       | `false` |
//!
//! Only malformed input encoding is an error; a proof that fails to verify
//! is a plain `false`.
//!
//! ## Transaction hashes
//!
//! [`TxHashCommitmentSystem`] hides the buyer's purchase and delivery
//! transaction hashes behind commitments bound to one tx-hash binding tag
//! (see `tradeseal_binding::tx_hash_binding_tag`), so the two can be linked
//! to the same escrow without revealing either hash.
//!
//! ## Backends
//!
//! [`ValueProofSystem`] is the seam. The `mock` feature (on by default)
//! provides [`MockValueProofSystem`], a deterministic SHA-256 transcript
//! that is **not private**. It reproduces the transcript and binding
//! semantics of a range-proof backend so that everything above the seam
//! can be exercised end to end.

#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;
pub mod verifier;
pub mod wire;

#[cfg(feature = "mock")]
pub use mock::MockValueProofSystem;
pub use traits::{
    ProofError, TxHashCommitmentSystem, TxHashWitness, ValueProof, ValueProofSystem, ValueWitness,
    VerifyError,
};
pub use verifier::ValueCommitmentVerifier;
pub use wire::{
    derive_tx_blinding, GenerateRequest, GenerateResponse, TxHashCommitRequest, TxHashCommitResponse,
    TxHashVerifyRequest, VerifyRequest, VerifyResponse,
};
