//! # Value Commitment Verifier
//!
//! Stateless front end over a [`ValueProofSystem`]. The hex entry points
//! separate the two failure classes: malformed encoding is an `Err`,
//! anything that decodes but does not verify is `Ok(false)`.

use std::sync::Arc;

use tradeseal_binding::BindingTag;
use tradeseal_core::{decode_hex, Bytes32};

use crate::traits::{TxHashCommitmentSystem, ValueProofSystem, VerifyError};

#[derive(Debug)]
pub struct ValueCommitmentVerifier<P> {
    system: Arc<P>,
}

impl<P> Clone for ValueCommitmentVerifier<P> {
    fn clone(&self) -> Self {
        Self {
            system: Arc::clone(&self.system),
        }
    }
}

impl<P: ValueProofSystem> ValueCommitmentVerifier<P> {
    pub fn new(system: P) -> Self {
        Self {
            system: Arc::new(system),
        }
    }

    pub fn from_shared(system: Arc<P>) -> Self {
        Self { system }
    }

    pub fn system(&self) -> &P {
        &self.system
    }

    /// Verify decoded inputs.
    pub fn verify(
        &self,
        commitment: &Bytes32,
        proof: &[u8],
        binding_tag: Option<&BindingTag>,
    ) -> bool {
        let ok = self.system.verify(commitment, proof, binding_tag);
        if ok {
            tracing::debug!(
                backend = self.system.name(),
                commitment = %commitment,
                bound = binding_tag.is_some(),
                "value proof verified"
            );
        } else {
            tracing::warn!(
                backend = self.system.name(),
                commitment = %commitment,
                bound = binding_tag.is_some(),
                "value proof rejected"
            );
        }
        ok
    }

    /// Verify hex-encoded inputs (`0x` prefix optional).
    ///
    /// # Errors
    ///
    /// [`VerifyError::Malformed`] when the commitment is not 32 bytes of hex,
    /// the proof is not hex, or the tag is present but not 32 bytes of hex.
    /// A present but empty tag is malformed, not absent.
    pub fn verify_hex(
        &self,
        commitment_hex: &str,
        proof_hex: &str,
        binding_tag_hex: Option<&str>,
    ) -> Result<bool, VerifyError> {
        let commitment = Bytes32::parse_hex("commitment", commitment_hex)?;
        let proof = decode_hex("proof", proof_hex)?;
        let tag = binding_tag_hex.map(BindingTag::parse_hex).transpose()?;
        Ok(self.verify(&commitment, &proof, tag.as_ref()))
    }
}

impl<P: TxHashCommitmentSystem> ValueCommitmentVerifier<P> {
    /// Verify a decoded tx-hash commitment proof.
    pub fn verify_tx_hash(
        &self,
        commitment: &Bytes32,
        proof: &[u8],
        binding_tag: Option<&BindingTag>,
    ) -> bool {
        let ok = self.system.verify_tx_hash(commitment, proof, binding_tag);
        tracing::debug!(
            commitment = %commitment,
            bound = binding_tag.is_some(),
            verified = ok,
            "tx-hash commitment checked"
        );
        ok
    }

    /// Hex entry point for tx-hash commitments. Same error rules as
    /// [`verify_hex`](Self::verify_hex).
    pub fn verify_tx_hash_hex(
        &self,
        commitment_hex: &str,
        proof_hex: &str,
        binding_tag_hex: Option<&str>,
    ) -> Result<bool, VerifyError> {
        let commitment = Bytes32::parse_hex("commitment", commitment_hex)?;
        let proof = decode_hex("proof", proof_hex)?;
        let tag = binding_tag_hex.map(BindingTag::parse_hex).transpose()?;
        Ok(self.verify_tx_hash(&commitment, &proof, tag.as_ref()))
    }
}
