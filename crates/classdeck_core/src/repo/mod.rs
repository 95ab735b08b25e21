//! Repository layer for sections and the items they group.
//!
//! # Responsibility
//! - Define the durable order-store and section lifecycle contracts.
//! - Isolate SQLite query details from engine and service orchestration.
//!
//! # Invariants
//! - Every write checks ownership against the acting user.
//! - Order mutations run inside one immediate transaction each.

pub mod section_repo;
