//! # tradeseal-cli — CLI Tool for TradeSeal
//!
//! ## Subcommands
//!
//! - `tradeseal tag`: derive a binding tag from a context.
//! - `tradeseal commit`: compute a keccak price commitment.
//! - `tradeseal prove` / `tradeseal verify`: value proofs with the mock backend.
//! - `tradeseal simulate`: run a full escrow lifecycle with credentials.
//! - `tradeseal audit`: walk and audit a credential chain in a store directory.
//!
//! Every handler returns the process exit code: `0` on success, `1` when a
//! check (verification, audit) fails. Errors are reported through `anyhow`.

pub mod audit;
pub mod binding;
pub mod proof;
pub mod simulate;

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
