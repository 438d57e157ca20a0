//! # Stage Credential
//!
//! A W3C-style credential envelope whose subject records one lifecycle
//! stage of one escrowed product. The envelope is rigid; the subject holds
//! exactly the fields a binding tag is derived from, plus the price
//! disclosure.
//!
//! Credentials are stored as JCS-canonical bytes, so the content address of
//! a credential is a pure function of its fields.

use serde::{Deserialize, Serialize};
use tradeseal_binding::{binding_tag, BindingContext, BindingTag, ProtocolVersion};
use tradeseal_cas::ContentStore;
use tradeseal_core::{Address, Bytes32, ContentDigest, Stage, Timestamp, Wei};
use tradeseal_zkp::{ValueProofSystem, ValueWitness};

use crate::error::VcError;

pub const VC_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
pub const CREDENTIAL_TYPE: &str = "SupplyChainCredential";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: String,
    pub name: String,
}

impl Party {
    /// `did:ethr:<chainId>:<checksummed address>`.
    pub fn ethr(chain_id: u64, address: &Address, name: impl Into<String>) -> Self {
        Self {
            id: format!("did:ethr:{chain_id}:{address}"),
            name: name.into(),
        }
    }
}

/// Proof that a hidden price commitment opens to an in-range value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkProofRecord {
    /// Backend that produced the proof.
    pub protocol: String,
    /// `zkp-bind-v1` or `zkp-bind-v2`.
    pub binding_version: String,
    pub commitment: Bytes32,
    /// Hex-encoded proof bytes.
    pub proof: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_tag: Option<BindingTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDisclosure {
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_price: Option<Wei>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_proof: Option<ZkProofRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSubject {
    pub id: String,
    pub product_name: String,
    pub product_id: u64,
    pub chain_id: u64,
    pub escrow_address: Address,
    pub stage: Stage,
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_credential: Option<String>,
    #[serde(default)]
    pub price: PriceDisclosure,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash_commitment: Option<Bytes32>,
}

impl StageSubject {
    pub fn new(
        product_name: impl Into<String>,
        product_id: u64,
        chain_id: u64,
        escrow_address: Address,
        stage: Stage,
    ) -> Self {
        Self {
            id: format!("did:ethr:{chain_id}:{escrow_address}"),
            product_name: product_name.into(),
            product_id,
            chain_id,
            escrow_address,
            stage,
            schema_version: tradeseal_binding::DEFAULT_SCHEMA_VERSION.to_string(),
            previous_credential: None,
            price: PriceDisclosure::default(),
            tx_hash_commitment: None,
        }
    }

    pub fn with_previous(mut self, cid: &ContentDigest) -> Self {
        self.previous_credential = Some(cid.to_string());
        self
    }

    /// The binding context this subject describes.
    pub fn binding_context(&self) -> Result<BindingContext, VcError> {
        let mut ctx = BindingContext::new(
            self.chain_id,
            self.escrow_address,
            self.product_id,
            self.stage,
        )?
        .with_schema_version(self.schema_version.clone())?;
        if let Some(prev) = &self.previous_credential {
            ctx = ctx.with_previous_vc_cid(prev.clone())?;
        }
        Ok(ctx)
    }

    pub fn previous_digest(&self) -> Result<Option<ContentDigest>, VcError> {
        self.previous_credential
            .as_deref()
            .map(ContentDigest::parse)
            .transpose()
            .map_err(VcError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    pub issuer: Party,
    pub holder: Party,
    #[serde(rename = "issuanceDate")]
    pub issuance_date: Timestamp,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: StageSubject,
}

impl StageCredential {
    pub fn new(issuer: Party, holder: Party, subject: StageSubject, issued_at: Timestamp) -> Self {
        Self {
            context: vec![VC_CONTEXT.to_string()],
            id: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
            credential_type: vec!["VerifiableCredential".to_string(), CREDENTIAL_TYPE.to_string()],
            issuer,
            holder,
            issuance_date: issued_at,
            credential_subject: subject,
        }
    }

    pub fn stage(&self) -> Stage {
        self.credential_subject.stage
    }

    /// Hide the price behind a value proof bound to this credential's own
    /// context. Any later change to a bound subject field invalidates the
    /// proof.
    pub fn attach_value_proof<P: ValueProofSystem>(
        &mut self,
        system: &P,
        witness: &ValueWitness,
    ) -> Result<BindingTag, VcError> {
        let ctx = self.credential_subject.binding_context()?;
        let tag = binding_tag(&ctx);
        let proof = system.prove(witness, Some(&tag))?;
        self.credential_subject.price = PriceDisclosure {
            hidden: true,
            public_price: None,
            zk_proof: Some(ZkProofRecord {
                protocol: system.name().to_string(),
                binding_version: ProtocolVersion::for_context(&ctx).as_str().to_string(),
                commitment: proof.commitment,
                proof: hex::encode(&proof.proof),
                binding_tag: Some(tag),
            }),
        };
        tracing::debug!(
            stage = %self.stage(),
            product_id = self.credential_subject.product_id,
            binding_tag = %tag,
            "attached bound value proof"
        );
        Ok(tag)
    }

    /// Disclose the price in plaintext instead of proving it.
    pub fn disclose_price(&mut self, price: Wei) {
        self.credential_subject.price = PriceDisclosure {
            hidden: false,
            public_price: Some(price),
            zk_proof: None,
        };
    }

    pub fn publish<S: ContentStore>(&self, store: &S) -> Result<ContentDigest, VcError> {
        let cid = store.put_document(self)?;
        tracing::info!(%cid, stage = %self.stage(), "published stage credential");
        Ok(cid)
    }

    pub fn load<S: ContentStore + ?Sized>(store: &S, cid: &ContentDigest) -> Result<Self, VcError> {
        let bytes = store.get(cid)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
