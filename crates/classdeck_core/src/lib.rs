//! Core domain logic for Classdeck's ordered section boards.
//! This crate is the single source of truth for section ordering invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod rpc;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use engine::drag::{
    CreationBoard, DragEntity, DragError, DragOutcome, DragSession, DragState, MembershipBoard,
    RollbackPolicy,
};
pub use engine::reconcile::{
    InlineReconciler, ReconcileError, ReconcileNotice, ReconcileOutcome, Reconciler,
    ThreadReconciler, Ticket,
};
pub use engine::shell::{ShellBus, ShellEvent};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Classroom, ItemId, Membership, SectionedItem};
pub use model::request::{MoveRequest, OrderRequest, ReorderRequest, ShiftDirection, ShiftEntry};
pub use model::section::{OwnerId, Scope, Section, SectionId, SectionValidationError};
pub use model::snapshot::{SectionBucket, Snapshot, SnapshotError};
pub use repo::section_repo::{
    OrderStore, OrderStoreError, SectionDeletion, SectionRepository, SqliteOrderStore,
    StoreResult, StoredItem,
};
pub use rpc::{handle_request_json, RpcRequest, RpcResponse};
pub use service::board_service::{BoardService, BoardServiceError};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
