//! # Size Metrics
//!
//! Byte counts recorded once per accepted envelope: the compact JSON size
//! and the size after gzip compression. Pure function of the envelope.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::envelope::ProofEnvelope;
use crate::error::ProofRelayError;

/// Raw and compressed size of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeMetrics {
    /// Length of the compact JSON encoding.
    pub raw_bytes: u64,
    /// Length of the gzip stream of that encoding.
    pub gzip_bytes: u64,
}

impl SizeMetrics {
    /// Compute size metrics for an envelope.
    pub fn of(envelope: &ProofEnvelope) -> Result<Self, ProofRelayError> {
        let raw = serde_json::to_vec(envelope)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        let compressed = encoder.finish()?;
        Ok(Self {
            raw_bytes: raw.len() as u64,
            gzip_bytes: compressed.len() as u64,
        })
    }
}
