//! # Signing Subcommands
//!
//! Ed25519 key generation, envelope signing, and signature verification.
//!
//! Signatures cover the canonical bytes of `{id, chain, timestamp, payload}`
//! exactly as the ingestion pipeline recomputes them, so an envelope that
//! verifies here verifies at the API.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde_json::Value;

use proofrelay_crypto::{Ed25519KeyPair, Ed25519PublicKey, SignatureAlgorithm, SignatureVerifier, VerificationOutcome};
use proofrelay_schema::validate;

/// Placeholder that lets an unsigned envelope pass validation before signing.
const UNSIGNED: &str = "unsigned";

/// Arguments for `proofrelay keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Output directory for the keypair files.
    #[arg(long, short, default_value = ".")]
    pub output: PathBuf,
    /// Prefix for the key filenames.
    #[arg(long, default_value = "proofrelay")]
    pub prefix: String,
}

/// Arguments for `proofrelay sign`.
#[derive(Args, Debug)]
pub struct SignArgs {
    /// Private key file (hex-encoded 32-byte seed).
    #[arg(long)]
    pub key: PathBuf,
    /// Envelope JSON file. Any existing `signature` is replaced.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Write the signed envelope here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments for `proofrelay verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Public key file (hex or base64 of the 32-byte key).
    #[arg(long)]
    pub pubkey: PathBuf,
    /// Signed envelope JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Generate a new Ed25519 keypair and write `<prefix>.key` and `<prefix>.pub`.
pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let output_dir = &args.output;
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory: {}", output_dir.display()))?;

    let keypair = Ed25519KeyPair::generate();
    let public_hex = keypair.public_key().to_hex();

    let sk_path = output_dir.join(format!("{}.key", args.prefix));
    let pk_path = output_dir.join(format!("{}.pub", args.prefix));

    std::fs::write(&sk_path, keypair.seed_hex().as_bytes())
        .with_context(|| format!("failed to write private key: {}", sk_path.display()))?;
    std::fs::write(&pk_path, &public_hex)
        .with_context(|| format!("failed to write public key: {}", pk_path.display()))?;

    println!("OK: generated Ed25519 keypair");
    println!("  Private key: {}", sk_path.display());
    println!("  Public key:  {}", pk_path.display());
    println!("  PROOF_PUBLIC_KEY={public_hex}");

    Ok(0)
}

/// Sign an envelope file and emit it with its `signature` filled in.
pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let keypair = read_keypair(&args.key)?;
    let mut raw = crate::read_json(&args.file)?;

    let object = raw
        .as_object_mut()
        .ok_or_else(|| anyhow!("{} is not a JSON object", args.file.display()))?;
    let unsigned = match object.get("signature") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if unsigned {
        object.insert("signature".into(), Value::String(UNSIGNED.into()));
    }

    let mut envelope = match validate(&raw) {
        Ok(envelope) => envelope,
        Err(errors) => {
            println!("FAIL: envelope is invalid, not signing");
            for error in &errors {
                println!("  {error}");
            }
            return Ok(1);
        }
    };

    let message = envelope
        .signable_bytes()
        .context("failed to canonicalize envelope")?;
    envelope.signature = keypair.sign(&message).to_base64();
    let signed = serde_json::to_string_pretty(&envelope).context("failed to serialize envelope")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{signed}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("OK: signed envelope {} written to {}", envelope.id, path.display());
        }
        None => println!("{signed}"),
    }
    Ok(0)
}

/// Check an envelope's signature against a public key.
pub fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let material = std::fs::read_to_string(&args.pubkey)
        .with_context(|| format!("failed to read public key: {}", args.pubkey.display()))?;
    let public_key = Ed25519PublicKey::parse(&material).map_err(|e| anyhow!("invalid public key: {e}"))?;

    let raw = crate::read_json(&args.file)?;
    let envelope = match validate(&raw) {
        Ok(envelope) => envelope,
        Err(errors) => {
            println!("FAIL: envelope is invalid");
            for error in &errors {
                println!("  {error}");
            }
            return Ok(1);
        }
    };

    match SignatureVerifier::with_key(public_key, SignatureAlgorithm::Ed25519).verify(&envelope) {
        VerificationOutcome::Passed => {
            println!("OK: signature is valid");
            Ok(0)
        }
        VerificationOutcome::Failed(reason) => {
            println!("FAIL: signature verification failed: {reason}");
            Ok(1)
        }
        VerificationOutcome::Skipped => bail!("verifier skipped the check despite a configured key"),
    }
}

fn read_keypair(path: &Path) -> Result<Ed25519KeyPair> {
    if !path.exists() {
        bail!("private key file not found: {}", path.display());
    }
    let seed_hex = zeroize::Zeroizing::new(
        std::fs::read_to_string(path).with_context(|| format!("failed to read private key: {}", path.display()))?,
    );
    Ed25519KeyPair::from_seed_hex(&seed_hex).map_err(|e| anyhow!("invalid private key: {e}"))
}
