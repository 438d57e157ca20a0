//! # Mock Value Proof System
//!
//! Deterministic, transparent stand-in for a range-proof backend.
//!
//! ```text
//! commitment = SHA256("tradeseal/value-commitment/v1" || value_be64 || blinding)
//! transcript = SHA256("ValueRangeProof" [|| "bind" || tag] || "commitment" || C || "n" || 64)
//! proof      = 0x01 || transcript
//! ```
//!
//! Transaction hashes use their own domain, label and proof version:
//!
//! ```text
//! commitment = SHA256("tradeseal/tx-hash-commitment/v1" || tx_hash || blinding)
//! transcript = SHA256("TxHashCommitment" [|| "bind" || tag] || "commitment" || C || "n" || 64)
//! proof      = 0x02 || transcript
//! ```
//!
//! ## Security Warning
//!
//! **NOT PRIVATE.** Anyone can recompute a proof from a commitment. The
//! mock exists so that binding semantics (a tag absorbed into the
//! transcript) can be exercised without a real prover.

use sha2::{Digest, Sha256};
use tradeseal_binding::BindingTag;
use tradeseal_core::Bytes32;

use crate::traits::{
    ProofError, TxHashCommitmentSystem, TxHashWitness, ValueProof, ValueProofSystem, ValueWitness,
};

const COMMITMENT_DOMAIN: &[u8] = b"tradeseal/value-commitment/v1";
const TRANSCRIPT_LABEL: &[u8] = b"ValueRangeProof";
const TX_COMMITMENT_DOMAIN: &[u8] = b"tradeseal/tx-hash-commitment/v1";
const TX_TRANSCRIPT_LABEL: &[u8] = b"TxHashCommitment";
const RANGE_BITS: u64 = 64;
const PROOF_VERSION: u8 = 0x01;
const TX_PROOF_VERSION: u8 = 0x02;
const PROOF_LEN: usize = 33;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockValueProofSystem;

impl MockValueProofSystem {
    pub fn commit(value: u64, blinding: &Bytes32) -> Bytes32 {
        let mut h = Sha256::new();
        h.update(COMMITMENT_DOMAIN);
        h.update(value.to_be_bytes());
        h.update(blinding.as_bytes());
        Bytes32::new(h.finalize().into())
    }

    pub fn tx_hash_commitment(tx_hash: &Bytes32, blinding: &Bytes32) -> Bytes32 {
        let mut h = Sha256::new();
        h.update(TX_COMMITMENT_DOMAIN);
        h.update(tx_hash.as_bytes());
        h.update(blinding.as_bytes());
        Bytes32::new(h.finalize().into())
    }

    fn transcript(label: &[u8], commitment: &Bytes32, binding_tag: Option<&BindingTag>) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(label);
        if let Some(tag) = binding_tag {
            h.update(b"bind");
            h.update(tag.as_bytes());
        }
        h.update(b"commitment");
        h.update(commitment.as_bytes());
        h.update(b"n");
        h.update(RANGE_BITS.to_le_bytes());
        h.finalize().into()
    }
}

impl ValueProofSystem for MockValueProofSystem {
    fn name(&self) -> &'static str {
        "mock-sha256"
    }

    fn prove(
        &self,
        witness: &ValueWitness,
        binding_tag: Option<&BindingTag>,
    ) -> Result<ValueProof, ProofError> {
        let commitment = Self::commit(witness.value, &witness.blinding);
        let mut proof = Vec::with_capacity(PROOF_LEN);
        proof.push(PROOF_VERSION);
        proof.extend_from_slice(&Self::transcript(TRANSCRIPT_LABEL, &commitment, binding_tag));
        Ok(ValueProof { commitment, proof })
    }

    fn verify(&self, commitment: &Bytes32, proof: &[u8], binding_tag: Option<&BindingTag>) -> bool {
        if proof.len() != PROOF_LEN || proof[0] != PROOF_VERSION {
            return false;
        }
        proof[1..] == Self::transcript(TRANSCRIPT_LABEL, commitment, binding_tag)
    }
}

impl TxHashCommitmentSystem for MockValueProofSystem {
    fn commit_tx_hash(
        &self,
        witness: &TxHashWitness,
        binding_tag: Option<&BindingTag>,
    ) -> Result<ValueProof, ProofError> {
        let commitment = Self::tx_hash_commitment(&witness.tx_hash, &witness.blinding);
        let mut proof = Vec::with_capacity(PROOF_LEN);
        proof.push(TX_PROOF_VERSION);
        proof.extend_from_slice(&Self::transcript(TX_TRANSCRIPT_LABEL, &commitment, binding_tag));
        Ok(ValueProof { commitment, proof })
    }

    fn verify_tx_hash(&self, commitment: &Bytes32, proof: &[u8], binding_tag: Option<&BindingTag>) -> bool {
        if proof.len() != PROOF_LEN || proof[0] != TX_PROOF_VERSION {
            return false;
        }
        proof[1..] == Self::transcript(TX_TRANSCRIPT_LABEL, commitment, binding_tag)
    }
}
