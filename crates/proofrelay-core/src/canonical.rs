//! # Canonical Serialization — JCS Byte Production
//!
//! Defines `CanonicalBytes`, the only type accepted as signing input anywhere
//! in the workspace.
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. The only constructor is
//! [`CanonicalBytes::new()`], which serializes through RFC 8785 (JSON
//! Canonicalization Scheme): sorted object keys, compact separators, and
//! deterministic number formatting. A submitter that signs the JCS form of
//! `{id, chain, timestamp, payload}` produces exactly the bytes the verifier
//! checks, regardless of key order or whitespace in the submitted JSON.
//!
//! Unlike content digests, signing input cannot reject floats: the payload is
//! opaque chain data and JCS already fixes the float encoding.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Object keys are sorted, separators compact, output UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::SerializationFailed` if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
