//! JSON request boundary for embedding hosts.
//!
//! # Responsibility
//! - Decode move/reorder/snapshot requests from JSON.
//! - Run them against one store on behalf of an authenticated actor.
//! - Encode every result as a stable JSON envelope.
//!
//! # Invariants
//! - [`handle_request_json`] never panics and always returns valid JSON.
//! - Failures carry a machine-readable `errorCode`; messages are diagnostic
//!   only.

use crate::model::item::{Classroom, Membership};
use crate::model::request::{MoveRequest, ReorderRequest};
use crate::model::section::{OwnerId, Scope};
use crate::model::snapshot::Snapshot;
use crate::repo::section_repo::{OrderStore, SectionRepository, StoredItem};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

const ENCODE_FAILURE_ENVELOPE: &str =
    r#"{"ok":false,"errorCode":"encode_failed","message":"failed to encode response"}"#;

/// Requests accepted at the JSON boundary, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RpcRequest {
    Move(MoveRequest),
    Reorder(ReorderRequest),
    Snapshot { scope: Scope },
}

impl RpcRequest {
    fn label(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Reorder(_) => "reorder",
            Self::Snapshot { .. } => "snapshot",
        }
    }
}

/// Response envelope for every boundary call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub message: String,
    /// Present on successful snapshot queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sections: Option<Value>,
}

impl RpcResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            error_code: None,
            message: message.into(),
            sections: None,
        }
    }

    fn failure(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_code: Some(error_code.to_string()),
            message: message.into(),
            sections: None,
        }
    }
}

/// Decodes one JSON request, applies it, and returns the JSON envelope.
pub fn handle_request_json<S>(store: &mut S, actor: OwnerId, request_json: &str) -> String
where
    S: OrderStore + SectionRepository,
{
    let response = match serde_json::from_str::<RpcRequest>(request_json) {
        Ok(request) => handle_request(store, actor, &request),
        Err(err) => {
            warn!(
                "event=rpc_request module=rpc status=error error_code=invalid_request line={} column={}",
                err.line(),
                err.column()
            );
            RpcResponse::failure("invalid_request", format!("invalid request: {err}"))
        }
    };
    serde_json::to_string(&response).unwrap_or_else(|_| ENCODE_FAILURE_ENVELOPE.to_string())
}

/// Applies one decoded request.
pub fn handle_request<S>(store: &mut S, actor: OwnerId, request: &RpcRequest) -> RpcResponse
where
    S: OrderStore + SectionRepository,
{
    let started_at = Instant::now();
    let response = match request {
        RpcRequest::Move(request) => match store.apply_move(actor, request) {
            Ok(()) => RpcResponse::success("Item moved."),
            Err(err) => RpcResponse::failure(err.code(), err.to_string()),
        },
        RpcRequest::Reorder(request) => match store.apply_reorder(actor, request) {
            Ok(()) => RpcResponse::success("Sections reordered."),
            Err(err) => RpcResponse::failure(err.code(), err.to_string()),
        },
        RpcRequest::Snapshot { scope } => match scope {
            Scope::Creation => snapshot_response::<S, Classroom>(store, actor),
            Scope::Membership => snapshot_response::<S, Membership>(store, actor),
        },
    };

    let status = if response.ok { "ok" } else { "error" };
    info!(
        "event=rpc_request module=rpc status={} kind={} error_code={} duration_ms={}",
        status,
        request.label(),
        response.error_code.as_deref().unwrap_or("none"),
        started_at.elapsed().as_millis()
    );
    response
}

fn snapshot_response<S, K>(store: &S, actor: OwnerId) -> RpcResponse
where
    S: SectionRepository,
    K: StoredItem + Serialize,
{
    let buckets = match store.load_buckets::<K>(actor) {
        Ok(buckets) => buckets,
        Err(err) => return RpcResponse::failure(err.code(), err.to_string()),
    };
    let snapshot = match Snapshot::new(actor, buckets) {
        Ok(snapshot) => snapshot,
        Err(err) => return RpcResponse::failure("invalid_snapshot", err.to_string()),
    };
    match serde_json::to_value(snapshot.buckets()) {
        Ok(sections) => RpcResponse {
            sections: Some(sections),
            ..RpcResponse::success(format!("Loaded {} section(s).", snapshot.buckets().len()))
        },
        Err(err) => RpcResponse::failure("encode_failed", err.to_string()),
    }
}
