//! # tradeseal-vc — Stage Credentials
//!
//! Each lifecycle stage of an escrow (listing, purchase, delivery) is
//! anchored by a credential document. Credentials link backwards through
//! `previousCredential`, forming a provenance chain that ends at the
//! listing credential. The escrow stores only the content address of the
//! latest credential per stage.
//!
//! A credential that hides the price carries a value proof whose binding
//! tag is derived from the credential's own subject fields. An auditor can
//! therefore walk the chain, recompute every tag from the documents alone,
//! and confirm that no proof was lifted from another product, chain or
//! stage.

pub mod audit;
pub mod chain;
pub mod credential;
pub mod error;

pub use audit::{audit_chain, AuditReport, StageFinding};
pub use chain::{ChainLink, ProvenanceChain, DEFAULT_MAX_DEPTH};
pub use credential::{Party, PriceDisclosure, StageCredential, StageSubject, ZkProofRecord};
pub use error::VcError;
