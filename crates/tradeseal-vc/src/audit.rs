//! # Auditor Verification
//!
//! An auditor holds only the escrow's anchored CID and the store. For every
//! credential on the chain the auditor recomputes the binding tag from the
//! credential's own subject and checks:
//!
//! - the recorded tag equals the recomputed one;
//! - the value proof verifies under the recomputed tag;
//! - stages strictly decrease walking backwards;
//! - every credential names the same chain, escrow and product;
//! - the newest CID equals what the escrow anchored.

use serde::Serialize;
use tradeseal_binding::binding_tag;
use tradeseal_core::{decode_hex, ContentDigest, Stage};
use tradeseal_zkp::{ValueCommitmentVerifier, ValueProofSystem};

use crate::chain::ProvenanceChain;
use crate::error::VcError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFinding {
    pub cid: ContentDigest,
    pub stage: Stage,
    pub tag_matches: bool,
    /// `None` when the price is disclosed in plaintext.
    pub proof_verified: Option<bool>,
    pub link_ordered: bool,
    pub same_product: bool,
}

impl StageFinding {
    pub fn ok(&self) -> bool {
        self.tag_matches
            && self.proof_verified.unwrap_or(true)
            && self.link_ordered
            && self.same_product
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub findings: Vec<StageFinding>,
    /// `None` when no anchor was supplied.
    pub anchor_matches: Option<bool>,
}

impl AuditReport {
    pub fn ok(&self) -> bool {
        !self.findings.is_empty()
            && self.findings.iter().all(StageFinding::ok)
            && self.anchor_matches.unwrap_or(true)
    }
}

pub fn audit_chain<P: ValueProofSystem>(
    chain: &ProvenanceChain,
    verifier: &ValueCommitmentVerifier<P>,
    anchored_cid: Option<&str>,
) -> Result<AuditReport, VcError> {
    let links = chain.links();
    let Some(latest) = links.first() else {
        return Ok(AuditReport {
            findings: Vec::new(),
            anchor_matches: anchored_cid.map(|_| false),
        });
    };
    let head = &latest.credential.credential_subject;

    let mut findings = Vec::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        let subject = &link.credential.credential_subject;
        let expected = binding_tag(&subject.binding_context()?);

        let (tag_matches, proof_verified) = match (&subject.price.zk_proof, subject.price.hidden) {
            (Some(record), _) => {
                let tag_matches = record.binding_tag == Some(expected);
                let verified = match decode_hex("proof", &record.proof) {
                    Ok(bytes) => verifier.verify(&record.commitment, &bytes, Some(&expected)),
                    Err(_) => false,
                };
                (tag_matches, Some(verified))
            }
            (None, true) => (false, Some(false)),
            (None, false) => (true, None),
        };

        let link_ordered = links
            .get(i + 1)
            .map_or(true, |older| older.credential.stage() < link.credential.stage());
        let same_product = subject.chain_id == head.chain_id
            && subject.escrow_address == head.escrow_address
            && subject.product_id == head.product_id;

        let finding = StageFinding {
            cid: link.cid,
            stage: link.credential.stage(),
            tag_matches,
            proof_verified,
            link_ordered,
            same_product,
        };
        if !finding.ok() {
            tracing::warn!(cid = %finding.cid, stage = %finding.stage, ?finding, "audit finding failed");
        }
        findings.push(finding);
    }

    let anchor_matches =
        anchored_cid.map(|anchor| ContentDigest::parse(anchor).ok() == Some(latest.cid));

    Ok(AuditReport {
        findings,
        anchor_matches,
    })
}
