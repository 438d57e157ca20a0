//! # tradeseal-binding — Commitment Binder
//!
//! A value proof on its own says "this commitment opens to a value in range".
//! Nothing stops the same proof from being presented for a different escrow,
//! a different product, another chain, or a later lifecycle stage. The
//! binder closes that gap: it derives a **binding tag** from the full
//! context in which a proof is meaningful, and the prover absorbs the tag
//! into its transcript. A verifier holding a different context computes a
//! different tag and rejects the proof.
//!
//! ```text
//! protocol = previous_vc_cid.is_some() ? "zkp-bind-v2" : "zkp-bind-v1"
//! tag      = keccak256(packed(protocol, chainId:u256, escrow:address,
//!                             productId:u256, stage:u8, schemaVersion
//!                             [, previousVcCid]))
//! ```
//!
//! The same module also derives the keccak price commitment stored in the
//! escrow and the deterministic blinding factor sellers use for it.

pub mod commitment;
pub mod context;
pub mod error;
pub mod tag;

pub use commitment::{
    commitments_match, deterministic_blinding, price_commitment, tx_hash_binding_tag,
};
pub use context::{check_previous_vc_cid, BindingContext, BindingContextInput, DEFAULT_SCHEMA_VERSION};
pub use error::BindingError;
pub use tag::{binding_tag, BindingTag, ProtocolVersion};
