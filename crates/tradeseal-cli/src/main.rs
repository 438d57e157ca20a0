//! # tradeseal CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tradeseal_cli::audit::{run_audit, AuditArgs};
use tradeseal_cli::binding::{run_commit, run_tag, CommitArgs, TagArgs};
use tradeseal_cli::proof::{run_prove, run_verify, ProveArgs, VerifyArgs};
use tradeseal_cli::simulate::{run_simulate, SimulateArgs};

/// TradeSeal: confidential trade escrow toolchain.
///
/// Binding tags, price commitments, value proofs, lifecycle simulation and
/// credential-chain audits.
#[derive(Parser, Debug)]
#[command(name = "tradeseal", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Derive the binding tag for a (chain, escrow, product, stage) context.
    Tag(TagArgs),

    /// Compute the keccak price commitment stored by an escrow.
    Commit(CommitArgs),

    /// Generate a value commitment and proof, optionally bound to a tag.
    Prove(ProveArgs),

    /// Verify a value proof against a commitment and optional tag.
    Verify(VerifyArgs),

    /// Run a complete escrow lifecycle with stage credentials.
    Simulate(SimulateArgs),

    /// Audit a stored credential chain.
    Audit(AuditArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Tag(args) => run_tag(args),
        Commands::Commit(args) => run_commit(args),
        Commands::Prove(args) => run_prove(args),
        Commands::Verify(args) => run_verify(args),
        Commands::Simulate(args) => run_simulate(args),
        Commands::Audit(args) => run_audit(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
