//! Request and response bodies of the proof service. Field names are part
//! of the external contract.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tradeseal_binding::BindingTag;
use tradeseal_core::Bytes32;

use crate::traits::{
    ProofError, TxHashCommitmentSystem, TxHashWitness, ValueProofSystem, ValueWitness, VerifyError,
};
use crate::verifier::ValueCommitmentVerifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub value: u64,
    pub blinding_hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_tag_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub commitment: String,
    pub proof: String,
    /// Self-check of the freshly generated proof.
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub commitment: String,
    pub proof: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_tag_hex: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

/// Commit to a 32-byte transaction hash (`0x` optional).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHashCommitRequest {
    pub tx_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_tag_hex: Option<String>,
    /// When absent the blinding is derived from the hash and tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blinding_hex: Option<String>,
}

/// Same shape as a value-commitment response.
pub type TxHashCommitResponse = GenerateResponse;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHashVerifyRequest {
    pub commitment: String,
    pub proof: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_tag_hex: Option<String>,
}

fn parse_tag(hex: Option<&str>) -> Result<Option<BindingTag>, tradeseal_core::ValidationError> {
    hex.map(BindingTag::parse_hex).transpose()
}

/// Blinding used when a tx-hash commit request carries none.
pub fn derive_tx_blinding(tx_hash: &Bytes32, binding_tag: Option<&BindingTag>) -> Bytes32 {
    let mut h = Sha256::new();
    h.update(b"tradeseal/tx-hash-blinding/v1");
    h.update(tx_hash.as_bytes());
    if let Some(tag) = binding_tag {
        h.update(tag.as_bytes());
    }
    Bytes32::new(h.finalize().into())
}

impl GenerateRequest {
    pub fn execute<P: ValueProofSystem>(&self, system: &P) -> Result<GenerateResponse, ProofError> {
        let blinding = Bytes32::parse_hex("blinding", &self.blinding_hex)?;
        let tag = parse_tag(self.binding_tag_hex.as_deref())?;
        let witness = ValueWitness {
            value: self.value,
            blinding,
        };
        let out = system.prove(&witness, tag.as_ref())?;
        let verified = system.verify(&out.commitment, &out.proof, tag.as_ref());
        Ok(GenerateResponse {
            commitment: out.commitment.to_hex(),
            proof: hex::encode(&out.proof),
            verified,
        })
    }
}

impl VerifyRequest {
    pub fn execute<P: ValueProofSystem>(
        &self,
        verifier: &ValueCommitmentVerifier<P>,
    ) -> Result<VerifyResponse, VerifyError> {
        let verified =
            verifier.verify_hex(&self.commitment, &self.proof, self.binding_tag_hex.as_deref())?;
        Ok(VerifyResponse { verified })
    }
}

impl TxHashCommitRequest {
    pub fn execute<P: TxHashCommitmentSystem>(&self, system: &P) -> Result<TxHashCommitResponse, ProofError> {
        let tx_hash = Bytes32::parse_hex("tx_hash", self.tx_hash.trim())?;
        let tag = parse_tag(self.binding_tag_hex.as_deref())?;
        let blinding = match self.blinding_hex.as_deref() {
            Some(b) => Bytes32::parse_hex("blinding", b)?,
            None => derive_tx_blinding(&tx_hash, tag.as_ref()),
        };
        let out = system.commit_tx_hash(&TxHashWitness { tx_hash, blinding }, tag.as_ref())?;
        let verified = system.verify_tx_hash(&out.commitment, &out.proof, tag.as_ref());
        Ok(TxHashCommitResponse {
            commitment: out.commitment.to_hex(),
            proof: hex::encode(&out.proof),
            verified,
        })
    }
}

impl TxHashVerifyRequest {
    pub fn execute<P: TxHashCommitmentSystem>(
        &self,
        verifier: &ValueCommitmentVerifier<P>,
    ) -> Result<VerifyResponse, VerifyError> {
        let verified = verifier.verify_tx_hash_hex(
            &self.commitment,
            &self.proof,
            self.binding_tag_hex.as_deref(),
        )?;
        Ok(VerifyResponse { verified })
    }
}
