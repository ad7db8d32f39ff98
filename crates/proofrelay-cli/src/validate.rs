//! # Validate Subcommand
//!
//! Runs the same schema checks the ingestion pipeline applies and prints
//! every field error, so submitters can fix an envelope before sending it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use proofrelay_schema::validate;

/// Arguments for `proofrelay validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Envelope JSON file.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let raw = crate::read_json(&args.file)?;
    match validate(&raw) {
        Ok(envelope) => {
            println!("OK: envelope {} is valid", envelope.id);
            Ok(0)
        }
        Err(errors) => {
            println!("FAIL: {} error(s) in {}", errors.len(), args.file.display());
            for error in &errors {
                println!("  {error}");
            }
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &tempfile::TempDir, value: &serde_json::Value) -> PathBuf {
        let path = dir.path().join("envelope.json");
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn valid_envelope_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            &dir,
            &json!({
                "id": "p1",
                "chain": "starknet",
                "timestamp": "2025-01-01T00:00:00Z",
                "payload": {"proof": "0x1"},
                "signature": "c2ln"
            }),
        );
        assert_eq!(run_validate(&ValidateArgs { file }).unwrap(), 0);
    }

    #[test]
    fn invalid_envelope_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, &json!({"id": "p1", "payload": []}));
        assert_eq!(run_validate(&ValidateArgs { file }).unwrap(), 1);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("missing.json");
        assert!(run_validate(&ValidateArgs { file }).is_err());
    }
}
