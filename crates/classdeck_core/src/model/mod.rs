//! Domain model for ordered sections and the items they group.
//!
//! # Responsibility
//! - Define canonical data structures used by the ordering engine.
//! - Keep one section shape for both ordering scopes.
//!
//! # Invariants
//! - Every domain object is identified by a stable uuid.
//! - Section orders are dense (`1..=N`) within one (owner, scope) partition.

pub mod item;
pub mod request;
pub mod section;
pub mod snapshot;
