//! # proofrelay-verifier-client — External Verifier Client
//!
//! Submits accepted envelopes to the external verification service and turns
//! every possible outcome into a [`VerifierVerdict`]:
//!
//! | Response                              | Verdict     |
//! |---------------------------------------|-------------|
//! | 2xx                                   | `Accepted`  |
//! | 2xx with `"verified": false`          | `Rejected`  |
//! | 408, 429, 5xx                         | `Transient` |
//! | any other 4xx                         | `Rejected`  |
//! | transport error, timeout, other codes | `Transient` |
//!
//! `submit` never returns an error: failure to reach the verifier is itself
//! a verdict. The [`ExternalVerifier`] trait is the seam the reconciler
//! depends on, so tests substitute a scripted verifier.

pub mod classify;
pub mod client;
pub mod config;
pub mod error;

pub use classify::{classify, VerifierVerdict};
pub use client::{ExternalVerifier, VerifierClient};
pub use config::{ConfigError, VerifierConfig};
pub use error::{TerminalVerifierError, TransientVerifierError, VerifierError};
