//! # proofrelay-crypto — Envelope Authenticity
//!
//! - **Ed25519** key handling, signing (for submitters and tests) and
//!   verification over [`CanonicalBytes`](proofrelay_core::CanonicalBytes).
//! - **[`SignatureVerifier`]**, the pipeline stage that turns an envelope and
//!   an optional configured key into a [`VerificationOutcome`].

pub mod ed25519;
pub mod error;
pub mod signature;

pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use error::CryptoError;
pub use signature::{SignatureAlgorithm, SignatureVerifier, VerificationOutcome};
