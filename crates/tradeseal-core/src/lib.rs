//! # tradeseal-core — Primitive Types for the TradeSeal Escrow
//!
//! This crate is the leaf of the workspace DAG. It defines the value types
//! that every other crate exchanges: account addresses, 32-byte words used
//! for commitments and binding tags, wei amounts, lifecycle stages and UTC
//! timestamps, plus the two hashing paths the system relies on.
//!
//! ## Key Design Principles
//!
//! 1. **Newtypes for every on-chain primitive.** `Address`, `Bytes32`, `Wei`
//!    and `Stage` all have validated constructors. No bare strings or
//!    integers cross a crate boundary.
//!
//! 2. **One packed encoder.** Everything hashed with keccak-256 is built by
//!    [`PackedEncoder`], which reproduces Solidity `abi.encodePacked` byte
//!    for byte. Commitments and binding tags computed here match the values
//!    a contract computes on chain.
//!
//! 3. **`CanonicalBytes` for documents.** Off-chain documents (credentials)
//!    are hashed through [`CanonicalBytes`] (RFC 8785 JCS) so the same
//!    document always produces the same content address.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tradeseal-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod address;
pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod hash;
pub mod stage;
pub mod temporal;

pub use address::Address;
pub use amount::Wei;
pub use canonical::CanonicalBytes;
pub use digest::{sha256_bytes, sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ErrorKind, ValidationError};
pub use hash::{decode_hex, keccak256, Bytes32, PackedEncoder};
pub use stage::Stage;
pub use temporal::Timestamp;
