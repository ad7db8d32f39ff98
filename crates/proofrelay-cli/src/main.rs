//! # proofrelay CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use proofrelay_cli::signing::{run_keygen, run_sign, run_verify, KeygenArgs, SignArgs, VerifyArgs};
use proofrelay_cli::validate::{run_validate, ValidateArgs};

/// proofrelay operator CLI.
///
/// Generates submitter keys, signs and verifies proof envelopes, and checks
/// envelopes against the ingestion schema.
#[derive(Parser, Debug)]
#[command(name = "proofrelay", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 keypair.
    Keygen(KeygenArgs),

    /// Sign a proof envelope.
    Sign(SignArgs),

    /// Verify a proof envelope's signature.
    Verify(VerifyArgs),

    /// Check a proof envelope against the ingestion schema.
    Validate(ValidateArgs),
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

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Sign(args) => run_sign(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::Validate(args) => run_validate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
