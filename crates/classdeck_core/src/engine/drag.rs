//! Drag session controller.
//!
//! # Responsibility
//! - Track which section or item is being dragged.
//! - On drop, apply the optimistic mutation and hand the matching request to
//!   the reconciliation channel.
//! - Apply the configured rollback policy when reconciliation fails.
//!
//! # Invariants
//! - Only the snapshot owner may start a drag; rejection happens before any
//!   state change.
//! - The local snapshot is only ever replaced, never mutated in place.
//! - Every dispatched request is tracked until its outcome is polled.

use crate::engine::mutator::{move_item_between_sections, plan_reorder};
use crate::engine::reconcile::{ReconcileNotice, ReconcileOutcome, Reconciler, Ticket};
use crate::engine::shell::{ShellBus, ShellEvent};
use crate::model::item::{Classroom, ItemId, Membership, SectionedItem};
use crate::model::request::MoveRequest;
use crate::model::section::{OwnerId, SectionId};
use crate::model::snapshot::Snapshot;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::Receiver;
use uuid::Uuid;

/// What happens to the local view when the store rejects a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Keep the optimistic view and flag the session for resync.
    #[default]
    KeepOptimistic,
    /// Restore the pre-move view if nothing was layered on top of it;
    /// otherwise flag the session for resync.
    RestorePreMove,
}

impl RollbackPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep_optimistic" => Some(Self::KeepOptimistic),
            "restore" | "restore_pre_move" => Some(Self::RestorePreMove),
            _ => None,
        }
    }
}

/// Entity a drag starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEntity {
    Item(ItemId),
    Section(SectionId),
}

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    DraggingItem {
        item_id: ItemId,
        origin_section: SectionId,
        origin_index: usize,
    },
    DraggingSection {
        section_id: SectionId,
        origin_index: usize,
    },
}

/// Result of a completed drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Dropped on its origin; nothing changed.
    Unchanged,
    /// Item moved; `ticket` tracks the store request.
    ItemMoved { ticket: Ticket },
    /// Sections reordered; `ticket` tracks the store request.
    SectionsReordered { ticket: Ticket },
}

/// Precondition violations rejected at the controller boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragError {
    AlreadyDragging,
    NotDragging,
    /// Actor does not own the entities in view.
    NotOwner { actor: OwnerId, owner: OwnerId },
    /// Dragged entity is not in the current snapshot.
    UnknownEntity(Uuid),
    /// Drop target is not a section of the current snapshot.
    UnknownDropTarget(SectionId),
}

impl Display for DragError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyDragging => write!(f, "a drag is already in progress"),
            Self::NotDragging => write!(f, "no drag in progress"),
            Self::NotOwner { actor, owner } => {
                write!(f, "actor {actor} cannot drag entities owned by {owner}")
            }
            Self::UnknownEntity(id) => write!(f, "drag entity not found: {id}"),
            Self::UnknownDropTarget(id) => write!(f, "drop target not found: {id}"),
        }
    }
}

impl Error for DragError {}

#[derive(Debug)]
struct PendingChange<K> {
    before: Snapshot<K>,
    after: Snapshot<K>,
}

/// Drag controller for one owner's sections of one scope.
pub struct DragSession<K, R> {
    actor: OwnerId,
    snapshot: Snapshot<K>,
    state: DragState,
    reconciler: R,
    rollback: RollbackPolicy,
    pending: HashMap<Ticket, PendingChange<K>>,
    needs_resync: bool,
    shell: ShellBus,
}

/// Controller for sections of created classrooms.
pub type CreationBoard<R> = DragSession<Classroom, R>;
/// Controller for sections of joined classrooms.
pub type MembershipBoard<R> = DragSession<Membership, R>;

impl<K: SectionedItem, R: Reconciler> DragSession<K, R> {
    pub fn new(actor: OwnerId, snapshot: Snapshot<K>, reconciler: R) -> Self {
        Self {
            actor,
            snapshot,
            state: DragState::Idle,
            reconciler,
            rollback: RollbackPolicy::default(),
            pending: HashMap::new(),
            needs_resync: false,
            shell: ShellBus::new(),
        }
    }

    pub fn with_rollback_policy(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    /// Current rendered view.
    pub fn snapshot(&self) -> &Snapshot<K> {
        &self.snapshot
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn actor(&self) -> OwnerId {
        self.actor
    }

    /// True once a failed reconciliation left the local view diverged.
    pub fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Requests dispatched but not yet reported back.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn reconciler(&self) -> &R {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut R {
        &mut self.reconciler
    }

    pub fn into_reconciler(self) -> R {
        self.reconciler
    }

    /// Subscribes a section view to shell toggle events.
    pub fn subscribe_shell(&mut self) -> Receiver<ShellEvent> {
        self.shell.subscribe()
    }

    /// Publishes a shell toggle on behalf of the UI shell.
    pub fn publish_shell(&mut self, event: ShellEvent) -> usize {
        self.shell.publish(event)
    }

    /// Starts dragging `entity`.
    pub fn drag_start(&mut self, entity: DragEntity) -> Result<DragState, DragError> {
        if self.state != DragState::Idle {
            return Err(DragError::AlreadyDragging);
        }
        self.ensure_actor_owns_view()?;

        let next = match entity {
            DragEntity::Item(item_id) => {
                let (bucket_index, item_index) = self
                    .snapshot
                    .locate_item(item_id)
                    .ok_or(DragError::UnknownEntity(item_id))?;
                DragState::DraggingItem {
                    item_id,
                    origin_section: self.snapshot.buckets()[bucket_index].section_id(),
                    origin_index: item_index,
                }
            }
            DragEntity::Section(section_id) => {
                let origin_index = self
                    .snapshot
                    .section_index(section_id)
                    .ok_or(DragError::UnknownEntity(section_id))?;
                self.shell.publish(ShellEvent::CollapseAll);
                DragState::DraggingSection {
                    section_id,
                    origin_index,
                }
            }
        };

        debug!(
            "event=drag_start module=engine status=ok kind={}",
            state_kind(next)
        );
        self.state = next;
        Ok(next)
    }

    /// Ends the current drag over `drop_target`.
    ///
    /// Returns to `Idle` whether the drop is applied, a no-op, or rejected.
    pub fn drag_end(&mut self, drop_target: SectionId) -> Result<DragOutcome, DragError> {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        match state {
            DragState::Idle => Err(DragError::NotDragging),
            DragState::DraggingItem {
                item_id,
                origin_section,
                ..
            } => self.drop_item(item_id, origin_section, drop_target),
            DragState::DraggingSection { section_id, .. } => {
                self.shell.publish(ShellEvent::RestoreCollapse);
                self.drop_section(section_id, drop_target)
            }
        }
    }

    /// Abandons the current drag without side effects.
    pub fn drag_cancel(&mut self) {
        let state = std::mem::replace(&mut self.state, DragState::Idle);
        if let DragState::DraggingSection { .. } = state {
            self.shell.publish(ShellEvent::RestoreCollapse);
        }
        if state != DragState::Idle {
            debug!(
                "event=drag_cancel module=engine status=ok kind={}",
                state_kind(state)
            );
        }
    }

    /// Drains reconciliation outcomes and returns notices for failures.
    pub fn poll_reconciliation(&mut self) -> Vec<ReconcileNotice> {
        let mut notices = Vec::new();
        for outcome in self.reconciler.poll() {
            let pending = self.pending.remove(&outcome.ticket());
            let ReconcileOutcome::Failed(notice) = outcome else {
                continue;
            };
            self.apply_rollback(pending);
            warn!(
                "event=reconcile_failed module=engine status=error kind={} ticket={} error_code={} needs_resync={}",
                notice.request_kind, notice.ticket, notice.error_code, self.needs_resync
            );
            notices.push(notice);
        }
        notices
    }

    /// Replaces the local view with a freshly loaded one.
    ///
    /// Cancels any drag in progress and clears the resync flag.
    pub fn resync(&mut self, snapshot: Snapshot<K>) -> Result<(), DragError> {
        if snapshot.owner_id() != self.actor {
            return Err(DragError::NotOwner {
                actor: self.actor,
                owner: snapshot.owner_id(),
            });
        }
        self.drag_cancel();
        self.snapshot = snapshot;
        self.needs_resync = false;
        info!(
            "event=snapshot_resync module=engine status=ok sections={} items={}",
            self.snapshot.buckets().len(),
            self.snapshot.item_count()
        );
        Ok(())
    }

    fn drop_item(
        &mut self,
        item_id: ItemId,
        origin_section: SectionId,
        drop_target: SectionId,
    ) -> Result<DragOutcome, DragError> {
        if drop_target == origin_section {
            return Ok(DragOutcome::Unchanged);
        }
        if self.snapshot.section_index(drop_target).is_none() {
            return Err(DragError::UnknownDropTarget(drop_target));
        }
        // A rollback polled mid-drag may have put the item back elsewhere.
        let (bucket_index, _) = self
            .snapshot
            .locate_item(item_id)
            .ok_or(DragError::UnknownEntity(item_id))?;
        let current_section = self.snapshot.buckets()[bucket_index].section_id();
        if current_section == drop_target {
            return Ok(DragOutcome::Unchanged);
        }

        let next = move_item_between_sections(item_id, current_section, drop_target, &self.snapshot);
        let before = std::mem::replace(&mut self.snapshot, next);
        let ticket = self.reconciler.persist_move(
            self.actor,
            MoveRequest {
                item_id,
                section_id: drop_target,
                scope: K::SCOPE,
            },
        );
        self.track(ticket, before);
        info!(
            "event=drag_end module=engine status=ok kind=item ticket={}",
            ticket
        );
        Ok(DragOutcome::ItemMoved { ticket })
    }

    fn drop_section(
        &mut self,
        section_id: SectionId,
        drop_target: SectionId,
    ) -> Result<DragOutcome, DragError> {
        if drop_target == section_id {
            return Ok(DragOutcome::Unchanged);
        }
        if self.snapshot.section_index(drop_target).is_none() {
            return Err(DragError::UnknownDropTarget(drop_target));
        }
        let plan = plan_reorder(section_id, drop_target, &self.snapshot)
            .ok_or(DragError::UnknownEntity(section_id))?;

        let shifted = plan.request.shift_set.len();
        let before = std::mem::replace(&mut self.snapshot, plan.snapshot);
        let ticket = self.reconciler.persist_reorder(self.actor, plan.request);
        self.track(ticket, before);
        info!(
            "event=drag_end module=engine status=ok kind=section ticket={} shifted={}",
            ticket, shifted
        );
        Ok(DragOutcome::SectionsReordered { ticket })
    }

    fn track(&mut self, ticket: Ticket, before: Snapshot<K>) {
        self.pending.insert(
            ticket,
            PendingChange {
                before,
                after: self.snapshot.clone(),
            },
        );
    }

    fn apply_rollback(&mut self, pending: Option<PendingChange<K>>) {
        match (self.rollback, pending) {
            (RollbackPolicy::RestorePreMove, Some(change)) if change.after.same_as(&self.snapshot) => {
                self.snapshot = change.before;
            }
            _ => self.needs_resync = true,
        }
    }

    fn ensure_actor_owns_view(&self) -> Result<(), DragError> {
        let owner = self.snapshot.owner_id();
        if owner != self.actor {
            warn!("event=drag_start module=engine status=error error_code=not_owner");
            return Err(DragError::NotOwner {
                actor: self.actor,
                owner,
            });
        }
        Ok(())
    }
}

fn state_kind(state: DragState) -> &'static str {
    match state {
        DragState::Idle => "idle",
        DragState::DraggingItem { .. } => "item",
        DragState::DraggingSection { .. } => "section",
    }
}
