//! # Simulate Subcommand
//!
//! Runs one product through the whole lifecycle in memory: deterministic
//! creation, hidden-price listing credential, purchase, order confirmation
//! with a purchase credential, transporter bidding and assignment, delivery
//! with a delivery credential, then an audit of the resulting credential
//! chain against the escrow's anchor.
//!
//! The buyer commits to the (simulated) purchase and delivery transaction
//! hashes under the escrow's tx-hash binding tag. After delivery the buyer
//! re-anchors a delivery credential carrying the second commitment.
//!
//! Credentials go to `--store-dir` when given (so `tradeseal audit` can
//! inspect them afterwards), otherwise to an in-memory store.

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Args;
use serde::Serialize;

use tradeseal_binding::{deterministic_blinding, price_commitment, BindingTag};
use tradeseal_cas::{CachedStore, ContentStore, FsStore, MemoryStore};
use tradeseal_core::{Address, Bytes32, ContentDigest, PackedEncoder, Stage, Timestamp, Wei};
use tradeseal_escrow::{CallContext, EscrowConfig, EscrowFactory, InMemoryLedger};
use tradeseal_vc::{
    audit_chain, AuditReport, Party, ProvenanceChain, StageCredential, StageSubject,
};
use tradeseal_zkp::{
    derive_tx_blinding, MockValueProofSystem, TxHashCommitmentSystem, TxHashWitness, ValueCommitmentVerifier,
    ValueProof, ValueWitness,
};

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(long, default_value = "Sample shipment")]
    pub name: String,
    /// Sale price in wei.
    #[arg(long, default_value_t = 1_000_000)]
    pub price: u64,
    #[arg(long, default_value_t = 10_000)]
    pub fee: u64,
    #[arg(long, default_value_t = 50_000)]
    pub deposit: u64,
    /// Salt for the deterministic product address.
    #[arg(long, default_value_t = 1)]
    pub salt: u64,
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub product: Address,
    pub product_id: u64,
    pub predicted_address_matched: bool,
    pub credentials: Vec<String>,
    pub seller_received: Wei,
    pub transporter_received: Wei,
    pub escrow_balance: Wei,
    pub conserved: bool,
    /// Both tx-hash commitments verify under the escrow's tx-hash tag.
    pub tx_commitments_linked: bool,
    pub audit: AuditReport,
}

impl SimulationReport {
    pub fn ok(&self) -> bool {
        self.predicted_address_matched
            && self.conserved
            && self.escrow_balance.is_zero()
            && self.tx_commitments_linked
            && self.audit.ok()
    }
}

const FACTORY: u64 = 0xfac7_0001;
const FACTORY_OWNER: u64 = 0xad;
const IMPLEMENTATION: u64 = 0x1e_0001;
const SELLER: u64 = 0xa1;
const BUYER: u64 = 0xb2;
const TRANSPORTER: u64 = 0xc3;

pub fn run_simulate(args: &SimulateArgs) -> Result<u8> {
    let report = match &args.store_dir {
        Some(dir) => simulate(args, &CachedStore::new(FsStore::new(dir)))?,
        None => simulate(args, &MemoryStore::new())?,
    };
    crate::print_json(&report)?;
    Ok(if report.ok() { 0 } else { 1 })
}

pub fn simulate<S: ContentStore>(args: &SimulateArgs, store: &S) -> Result<SimulationReport> {
    let config = EscrowConfig::from_env()?;
    let chain_id = config.chain_id;
    let seller = Address::from_low_u64(SELLER);
    let buyer = Address::from_low_u64(BUYER);
    let transporter = Address::from_low_u64(TRANSPORTER);
    let system = MockValueProofSystem;
    let mut ledger = InMemoryLedger::new();

    let start = Timestamp::now();
    let at = |who: Address, step: u64| CallContext::new(who, start.plus_secs(step));

    let factory = EscrowFactory::new(
        Address::from_low_u64(FACTORY),
        Address::from_low_u64(FACTORY_OWNER),
        Address::from_low_u64(IMPLEMENTATION),
        config,
    )?;

    // The blinding depends on the product address, so predict it first.
    let salt = Bytes32::from_low_u64(args.salt);
    let predicted = factory.predict_product_address(&salt);
    let blinding = deterministic_blinding(&predicted, &seller);
    let commitment = price_commitment(u128::from(args.price), &blinding);
    let handle = factory
        .create_product_deterministic(&at(seller, 0), &args.name, commitment, salt)
        .context("product creation failed")?;
    tracing::info!(product = %handle.address, product_id = handle.product_id, "product listed");

    let mut escrow = handle.instance.lock();
    let witness = ValueWitness {
        value: args.price,
        blinding,
    };
    let issue = |stage: Stage, previous: Option<&ContentDigest>, holder: (Address, &str)| {
        let mut subject = StageSubject::new(&args.name, handle.product_id, chain_id, handle.address, stage);
        if let Some(prev) = previous {
            subject = subject.with_previous(prev);
        }
        StageCredential::new(
            Party::ethr(chain_id, &seller, "Seller"),
            Party::ethr(chain_id, &holder.0, holder.1),
            subject,
            start,
        )
    };

    // Listing
    let mut listing = issue(Stage::Listing, None, (seller, "Seller"));
    listing.attach_value_proof(&system, &witness)?;
    let listing_cid = listing.publish(store)?;
    escrow.update_vc_cid(&at(seller, 1), listing_cid.to_string())?;

    // Purchase
    escrow.purchase(&at(buyer, 2), Wei::from(args.price))?;
    let tx_tag = BindingTag::from(
        escrow
            .tx_hash_binding_tag()
            .context("purchase recorded no buyer")?,
    );
    let purchase_tx = commit_tx_hash(&system, &handle.address, "purchase", &tx_tag)?;
    let mut purchase = issue(Stage::Purchase, Some(&listing_cid), (buyer, "Buyer"));
    purchase.attach_value_proof(&system, &witness)?;
    purchase.credential_subject.tx_hash_commitment = Some(purchase_tx.commitment);
    let purchase_cid = purchase.publish(store)?;
    escrow.confirm_order_with_commitment(
        &at(seller, 3),
        purchase_cid.to_string(),
        Some(purchase_tx.commitment),
    )?;

    // Transport
    escrow.create_transporter(&at(transporter, 4), Wei::from(args.fee))?;
    escrow.security_deposit(&at(transporter, 5), Wei::from(args.deposit))?;
    escrow.set_transporter(&at(seller, 6), transporter, Wei::from(args.fee))?;
    ensure!(escrow.is_conserved(), "escrow accounting diverged after assignment");

    // Delivery
    let mut delivery = issue(Stage::Delivery, Some(&purchase_cid), (buyer, "Buyer"));
    delivery.attach_value_proof(&system, &witness)?;
    let delivery_cid = delivery.publish(store)?;
    escrow.reveal_and_confirm_delivery(
        &at(buyer, 7),
        Wei::from(args.price),
        blinding,
        delivery_cid.to_string(),
        &mut ledger,
    )?;

    // Delivery tx-hash commitment, under the same tag as the purchase one.
    let delivery_tx = commit_tx_hash(&system, &handle.address, "delivery", &tx_tag)?;
    delivery.credential_subject.tx_hash_commitment = Some(delivery_tx.commitment);
    let final_cid = delivery.publish(store)?;
    escrow.update_vc_cid_after_delivery(&at(buyer, 8), final_cid.to_string(), Some(delivery_tx.commitment))?;

    let tx_commitments_linked = escrow.tx_hash_binding_tag() == Some(*tx_tag.as_word())
        && [&purchase_tx, &delivery_tx]
            .iter()
            .all(|p| system.verify_tx_hash(&p.commitment, &p.proof, Some(&tx_tag)));

    let chain = ProvenanceChain::traverse(store, &final_cid)?;
    let verifier = ValueCommitmentVerifier::new(system);
    let audit = audit_chain(&chain, &verifier, escrow.stage_cid(Stage::Delivery))?;

    Ok(SimulationReport {
        product: handle.address,
        product_id: handle.product_id,
        predicted_address_matched: predicted == handle.address,
        credentials: escrow.vc_history().to_vec(),
        seller_received: ledger.balance_of(&seller),
        transporter_received: ledger.balance_of(&transporter),
        escrow_balance: escrow.balance(),
        conserved: escrow.is_conserved(),
        tx_commitments_linked,
        audit,
    })
}

/// Commit to a simulated transaction hash for `step` of this product's
/// lifecycle, bound to the escrow's tx-hash tag.
fn commit_tx_hash(
    system: &MockValueProofSystem,
    product: &Address,
    step: &str,
    tag: &BindingTag,
) -> Result<ValueProof> {
    let mut enc = PackedEncoder::new();
    enc.address(product).string(step);
    let tx_hash = enc.keccak256();
    let witness = TxHashWitness {
        tx_hash,
        blinding: derive_tx_blinding(&tx_hash, Some(tag)),
    };
    let proof = system.commit_tx_hash(&witness, Some(tag))?;
    tracing::debug!(step, commitment = %proof.commitment, "tx-hash commitment issued");
    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(store_dir: Option<PathBuf>) -> SimulateArgs {
        SimulateArgs {
            name: "Test crate".into(),
            price: 1_000,
            fee: 50,
            deposit: 300,
            salt: 9,
            store_dir,
        }
    }

    #[test]
    fn in_memory_simulation_settles_and_audits() {
        let report = simulate(&args(None), &MemoryStore::new()).unwrap();
        assert!(report.ok(), "{report:?}");
        assert_eq!(report.seller_received, Wei::new(1_000));
        assert_eq!(report.transporter_received, Wei::new(350));
        // Listing, purchase, delivery and the re-anchored delivery credential.
        assert_eq!(report.credentials.len(), 4);
        assert_eq!(report.audit.findings.len(), 3);
        assert_eq!(report.audit.anchor_matches, Some(true));
        assert!(report.tx_commitments_linked);
    }

    #[test]
    fn filesystem_simulation_is_auditable_afterwards() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let report = simulate(&args(Some(dir.path().to_path_buf())), &store).unwrap();
        assert!(report.ok());

        let latest = report.credentials.last().unwrap();
        let audit = crate::audit::audit_store(&store, latest, Some(latest), 16).unwrap();
        assert!(audit.ok());
    }
}
