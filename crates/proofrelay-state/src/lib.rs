//! # proofrelay-state — Verification Lifecycle and Record Store
//!
//! ## Components
//!
//! - **Machine** (`machine.rs`): the `pending → submitted → {verified, failed}`
//!   lifecycle. Transitions are planned as a pure function of the current
//!   record and yield a guard plus an update, never a mutation.
//!
//! - **Store** (`store.rs`): the async [`ProofStore`] seam. Every status
//!   change goes through `compare_and_set_status`, keyed by id, expected
//!   status and expected attempt count.
//!
//! - **Memory** (`memory.rs`): [`InMemoryProofStore`], used in tests and when
//!   no database is configured.
//!
//! ## Design
//!
//! The machine decides *what* the next state is; the store decides *whether*
//! it still applies. Two workers that plan from the same snapshot produce the
//! same guard, and only the first CAS succeeds.

pub mod machine;
pub mod memory;
pub mod store;

pub use machine::{plan, StatusGuard, StatusUpdate, Transition, TransitionError};
pub use memory::InMemoryProofStore;
pub use store::{MetricsSummary, ProofStore, StoreError};
