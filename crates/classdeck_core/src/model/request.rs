//! Order-mutation requests sent from the engine to the store.
//!
//! # Invariants
//! - Field names serialize in camelCase to match the external request shapes.
//! - `ShiftEntry::order` always carries the pre-move order; the store applies
//!   the `±1` implied by `direction`.

use crate::model::item::ItemId;
use crate::model::section::{Scope, SectionId};
use serde::{Deserialize, Serialize};

/// Direction the shifted siblings travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShiftDirection {
    /// Active entry moved later; shifted siblings move toward the front (`-1`).
    Up,
    /// Active entry moved earlier; shifted siblings move toward the back (`+1`).
    Down,
}

impl ShiftDirection {
    /// Order delta applied to every shifted sibling.
    pub fn delta(self) -> i64 {
        match self {
            Self::Up => -1,
            Self::Down => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// One sibling section affected by a reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftEntry {
    #[serde(rename = "containerId")]
    pub section_id: SectionId,
    /// Pre-move order.
    pub order: i64,
}

impl ShiftEntry {
    /// Order after the shift is applied.
    pub fn shifted_order(&self, direction: ShiftDirection) -> i64 {
        self.order + direction.delta()
    }
}

/// Moves one item into another section.
///
/// Idempotent: re-applying the same request leaves the store unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub item_id: ItemId,
    #[serde(rename = "containerId")]
    pub section_id: SectionId,
    pub scope: Scope,
}

/// Moves one section to the position held by another.
///
/// Must be applied by the store as one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    #[serde(rename = "activeContainerId")]
    pub active_section_id: SectionId,
    #[serde(rename = "overContainerId")]
    pub over_section_id: SectionId,
    pub shift_set: Vec<ShiftEntry>,
    pub direction: ShiftDirection,
}

/// Any order mutation the reconciliation channel can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRequest {
    Move(MoveRequest),
    Reorder(ReorderRequest),
}

impl OrderRequest {
    /// Short stable label used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
            Self::Reorder(_) => "reorder",
        }
    }
}
