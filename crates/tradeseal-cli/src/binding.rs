//! # Binding Subcommands
//!
//! `tag` derives a binding tag; `commit` computes the escrow price
//! commitment, optionally deriving the blinding from escrow and seller.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use tradeseal_binding::{
    binding_tag, deterministic_blinding, price_commitment, BindingContextInput, ProtocolVersion,
};
use tradeseal_core::{Address, Bytes32};

#[derive(Args, Debug)]
pub struct TagArgs {
    #[arg(long, default_value_t = 11_155_111)]
    pub chain_id: u64,
    /// Escrow address (0x-prefixed hex; mixed case must be EIP-55).
    #[arg(long)]
    pub escrow: String,
    #[arg(long)]
    pub product_id: u64,
    /// 0 = listing, 1 = purchase, 2 = delivery.
    #[arg(long)]
    pub stage: u8,
    #[arg(long)]
    pub schema_version: Option<String>,
    /// CID of the previous stage credential; selects protocol v2.
    #[arg(long)]
    pub previous_cid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagOutput {
    pub binding_tag: String,
    pub protocol_version: &'static str,
}

pub fn run_tag(args: &TagArgs) -> Result<u8> {
    let input = BindingContextInput {
        chain_id: Some(args.chain_id),
        escrow_address: Some(args.escrow.clone()),
        product_id: Some(args.product_id),
        stage: Some(args.stage),
        schema_version: args.schema_version.clone(),
        previous_vc_cid: args.previous_cid.clone(),
    };
    let out = derive_tag(&input)?;
    crate::print_json(&out)?;
    Ok(0)
}

pub fn derive_tag(input: &BindingContextInput) -> Result<TagOutput> {
    let ctx = input.validate().context("invalid binding context")?;
    Ok(TagOutput {
        binding_tag: binding_tag(&ctx).to_hex(),
        protocol_version: ProtocolVersion::for_context(&ctx).as_str(),
    })
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Price in wei.
    #[arg(long)]
    pub value: u128,
    /// 32-byte blinding factor in hex. Derived from --escrow and --seller
    /// when omitted.
    #[arg(long)]
    pub blinding: Option<String>,
    #[arg(long)]
    pub escrow: Option<String>,
    #[arg(long)]
    pub seller: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitOutput {
    pub blinding: String,
    pub commitment: String,
}

pub fn run_commit(args: &CommitArgs) -> Result<u8> {
    let out = compute_commitment(args)?;
    crate::print_json(&out)?;
    Ok(0)
}

pub fn compute_commitment(args: &CommitArgs) -> Result<CommitOutput> {
    let blinding = match (&args.blinding, &args.escrow, &args.seller) {
        (Some(hex), _, _) => Bytes32::parse_hex("blinding", hex)?,
        (None, Some(escrow), Some(seller)) => {
            let escrow = Address::parse(escrow).context("invalid --escrow")?;
            let seller = Address::parse(seller).context("invalid --seller")?;
            deterministic_blinding(&escrow, &seller)
        }
        _ => bail!("either --blinding or both --escrow and --seller are required"),
    };
    Ok(CommitOutput {
        blinding: blinding.to_prefixed_hex(),
        commitment: price_commitment(args.value, &blinding).to_prefixed_hex(),
    })
}
