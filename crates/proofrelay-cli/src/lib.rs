//! # proofrelay-cli — Operator CLI
//!
//! Offline tooling for submitters and operators. Nothing here talks to
//! the API; every command works on local files.
//!
//! ## Subcommands
//!
//! - `proofrelay keygen`: write an Ed25519 keypair as hex files.
//! - `proofrelay sign`: fill in an envelope's base64 `signature`.
//! - `proofrelay verify`: check an envelope against a public key.
//! - `proofrelay validate`: run the envelope schema checks.
//!
//! Each handler returns an exit code: 0 on success, 1 when the envelope is
//! invalid or the signature does not verify. Operational errors (unreadable
//! files, bad keys) surface as `Err` and exit with 2.

pub mod signing;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse JSON: {}", path.display()))
}
