//! # API Route Modules
//!
//! - `proofs`: proof submission, record lookup, and aggregate metrics.

pub mod proofs;
