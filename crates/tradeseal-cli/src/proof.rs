//! # Proof Subcommands
//!
//! `prove` and `verify` run the same request types as the proof service,
//! against the mock backend, without a server.

use anyhow::Result;
use clap::Args;

use tradeseal_zkp::{
    GenerateRequest, GenerateResponse, MockValueProofSystem, ValueCommitmentVerifier,
    VerifyRequest, VerifyResponse,
};

#[derive(Args, Debug)]
pub struct ProveArgs {
    #[arg(long)]
    pub value: u64,
    /// 32-byte blinding factor in hex.
    #[arg(long)]
    pub blinding: String,
    /// Binding tag to absorb into the proof transcript.
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(long)]
    pub commitment: String,
    #[arg(long)]
    pub proof: String,
    #[arg(long)]
    pub tag: Option<String>,
}

pub fn prove(args: &ProveArgs) -> Result<GenerateResponse> {
    let req = GenerateRequest {
        value: args.value,
        blinding_hex: args.blinding.clone(),
        binding_tag_hex: args.tag.clone(),
    };
    Ok(req.execute(&MockValueProofSystem)?)
}

pub fn verify(args: &VerifyArgs) -> Result<VerifyResponse> {
    let verifier = ValueCommitmentVerifier::new(MockValueProofSystem);
    let req = VerifyRequest {
        commitment: args.commitment.clone(),
        proof: args.proof.clone(),
        binding_tag_hex: args.tag.clone(),
    };
    Ok(req.execute(&verifier)?)
}

pub fn run_prove(args: &ProveArgs) -> Result<u8> {
    crate::print_json(&prove(args)?)?;
    Ok(0)
}

/// Exit code 1 when the proof does not verify.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let resp = verify(args)?;
    crate::print_json(&resp)?;
    Ok(if resp.verified { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "b3d9660812695cf688a896d66e3349c1eb1e0ceb81307d2360f0f1ca3a3ad875";

    fn proved(tag: Option<&str>) -> GenerateResponse {
        prove(&ProveArgs {
            value: 500,
            blinding: format!("{:064x}", 42),
            tag: tag.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn prove_then_verify_exit_codes() {
        let out = proved(Some(TAG));
        assert!(out.verified);
        let ok = run_verify(&VerifyArgs {
            commitment: out.commitment.clone(),
            proof: out.proof.clone(),
            tag: Some(TAG.into()),
        })
        .unwrap();
        assert_eq!(ok, 0);
        let missing_tag = run_verify(&VerifyArgs {
            commitment: out.commitment,
            proof: out.proof,
            tag: None,
        })
        .unwrap();
        assert_eq!(missing_tag, 1);
    }

    #[test]
    fn malformed_commitment_is_an_error() {
        let out = proved(None);
        assert!(verify(&VerifyArgs {
            commitment: "0x1234".into(),
            proof: out.proof,
            tag: None,
        })
        .is_err());
    }
}
