//! # Audit Subcommand
//!
//! Walks a credential chain stored in a directory store (as written by
//! `tradeseal simulate --store-dir`) and audits every link.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use tradeseal_cas::{CachedStore, ContentStore, FsStore};
use tradeseal_core::ContentDigest;
use tradeseal_vc::{audit_chain, AuditReport, ProvenanceChain, DEFAULT_MAX_DEPTH};
use tradeseal_zkp::{MockValueProofSystem, ValueCommitmentVerifier};

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Store directory holding `{digest}.bin` objects.
    #[arg(long)]
    pub store_dir: PathBuf,
    /// CID of the latest credential (`sha256:<hex>` or bare hex).
    #[arg(long)]
    pub cid: String,
    /// CID the escrow anchored for the latest stage, if known.
    #[arg(long)]
    pub anchor: Option<String>,
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

pub fn audit_store<S: ContentStore + ?Sized>(
    store: &S,
    cid: &str,
    anchor: Option<&str>,
    max_depth: usize,
) -> Result<AuditReport> {
    let latest = ContentDigest::parse(cid).context("invalid --cid")?;
    let chain = ProvenanceChain::traverse_with_limit(store, &latest, max_depth)
        .with_context(|| format!("failed to walk credential chain from {latest}"))?;
    let verifier = ValueCommitmentVerifier::new(MockValueProofSystem);
    Ok(audit_chain(&chain, &verifier, anchor)?)
}

/// Exit code 1 when any finding fails.
pub fn run_audit(args: &AuditArgs) -> Result<u8> {
    let store = CachedStore::new(FsStore::new(&args.store_dir));
    let report = audit_store(&store, &args.cid, args.anchor.as_deref(), args.max_depth)?;
    crate::print_json(&report)?;
    Ok(if report.ok() { 0 } else { 1 })
}
