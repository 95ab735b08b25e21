//! Optimistic snapshot mutations.
//!
//! # Responsibility
//! - Apply a proposed move or reorder to the in-memory view before the store
//!   confirms it.
//!
//! # Invariants
//! - Functions are total over valid snapshots and never perform I/O.
//! - Input snapshots are never mutated; no-op cases return the input handle
//!   itself so reference identity signals "nothing to redraw".
//! - Item moves conserve the total item count.
//! - Reorders keep section orders a permutation of `1..=N`.

use crate::engine::position::compute_shift_range;
use crate::model::item::{ItemId, SectionedItem};
use crate::model::request::{ReorderRequest, ShiftEntry};
use crate::model::section::SectionId;
use crate::model::snapshot::{SectionBucket, Snapshot};
use std::collections::HashMap;

/// Result of planning one section reorder.
#[derive(Debug, Clone)]
pub struct ReorderPlan<K> {
    /// Snapshot with the reorder applied and buckets re-sorted.
    pub snapshot: Snapshot<K>,
    /// Request reproducing the same change at the store.
    pub request: ReorderRequest,
}

/// Moves one item from `from` to the end of `to`.
///
/// Returns the input unchanged when `from == to`, when either bucket is
/// missing, or when the item is not in `from`.
pub fn move_item_between_sections<K: SectionedItem>(
    item_id: ItemId,
    from: SectionId,
    to: SectionId,
    snapshot: &Snapshot<K>,
) -> Snapshot<K> {
    if from == to {
        return snapshot.clone();
    }
    let (Some(from_index), Some(to_index)) =
        (snapshot.section_index(from), snapshot.section_index(to))
    else {
        return snapshot.clone();
    };
    let Some(item_index) = snapshot.buckets()[from_index]
        .items
        .iter()
        .position(|item| item.item_id() == item_id)
    else {
        return snapshot.clone();
    };

    let mut buckets: Vec<SectionBucket<K>> = snapshot.buckets().to_vec();
    let mut moved = buckets[from_index].items.remove(item_index);
    moved.set_section_id(to);
    buckets[to_index].items.push(moved);

    Snapshot::from_sorted(snapshot.owner_id(), buckets)
}

/// Moves section `active` to the position of section `over`.
///
/// Returns the input unchanged on self-drop or unknown ids.
pub fn reorder_sections<K: SectionedItem>(
    active: SectionId,
    over: SectionId,
    snapshot: &Snapshot<K>,
) -> Snapshot<K> {
    match plan_reorder(active, over, snapshot) {
        Some(plan) => plan.snapshot,
        None => snapshot.clone(),
    }
}

/// Plans a section reorder: the optimistic snapshot plus the store request.
///
/// Returns `None` when there is nothing to do (self-drop or unknown ids).
pub fn plan_reorder<K: SectionedItem>(
    active: SectionId,
    over: SectionId,
    snapshot: &Snapshot<K>,
) -> Option<ReorderPlan<K>> {
    if active == over {
        return None;
    }
    let active_index = snapshot.section_index(active)?;
    let over_index = snapshot.section_index(over)?;
    let buckets = snapshot.buckets();

    let range = compute_shift_range(active_index, over_index, buckets).ok()?;
    let shift_set: Vec<ShiftEntry> = range
        .shifted
        .iter()
        .map(|bucket| ShiftEntry {
            section_id: bucket.section_id(),
            order: bucket.section.sort_order,
        })
        .collect();
    let direction = range.direction;

    let mut new_orders: HashMap<SectionId, i64> = shift_set
        .iter()
        .map(|entry| (entry.section_id, entry.shifted_order(direction)))
        .collect();
    new_orders.insert(active, buckets[over_index].section.sort_order);

    let mut reordered: Vec<SectionBucket<K>> = buckets.to_vec();
    for bucket in &mut reordered {
        if let Some(order) = new_orders.get(&bucket.section_id()) {
            bucket.section.sort_order = *order;
        }
    }
    reordered.sort_by_key(|bucket| bucket.section.sort_order);

    Some(ReorderPlan {
        snapshot: Snapshot::from_sorted(snapshot.owner_id(), reordered),
        request: ReorderRequest {
            active_section_id: active,
            over_section_id: over,
            shift_set,
            direction,
        },
    })
}
