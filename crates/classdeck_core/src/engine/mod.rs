//! Ordered-section reordering engine.
//!
//! # Responsibility
//! - Compute shift ranges for section reorders (`position`).
//! - Apply optimistic snapshot changes (`mutator`).
//! - Persist changes through the reconciliation channel (`reconcile`).
//! - Drive drags from start to drop (`drag`), publishing shell toggles
//!   (`shell`).
//!
//! # Invariants
//! - Engine code never blocks on the store; persistence is fire-and-forget
//!   from the caller's perspective, with outcomes polled later.

pub mod drag;
pub mod mutator;
pub mod position;
pub mod reconcile;
pub mod shell;
