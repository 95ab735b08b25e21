//! Immutable in-memory ordered view of one owner's sections.
//!
//! # Responsibility
//! - Hold the section list (with nested items) the UI renders.
//! - Validate store input and re-sort it on construction.
//!
//! # Invariants
//! - A snapshot is never mutated after construction; changes produce a new
//!   snapshot. [`Snapshot::same_as`] is the redraw signal.
//! - Buckets are sorted by `sort_order` ascending.
//! - Section orders form `1..=N`; exactly one section is default when N > 0.
//! - Every section and item belongs to the snapshot owner and scope, and every
//!   item references the bucket it sits in.

use crate::model::item::{ItemId, SectionedItem};
use crate::model::section::{OwnerId, Scope, Section, SectionId};
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// One section with the items it currently groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBucket<K> {
    pub section: Section,
    pub items: Vec<K>,
}

impl<K: SectionedItem> SectionBucket<K> {
    pub fn new(section: Section, items: Vec<K>) -> Self {
        Self { section, items }
    }

    pub fn section_id(&self) -> SectionId {
        self.section.section_id
    }

    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.items.iter().any(|item| item.item_id() == item_id)
    }
}

/// Errors raised when store input violates snapshot invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// Section belongs to another owner or scope.
    ForeignSection(SectionId),
    /// Item belongs to another owner.
    ForeignItem(ItemId),
    /// Item references a section other than its bucket.
    MisplacedItem { item_id: ItemId, section_id: SectionId },
    /// Same section or item appears twice.
    Duplicate(uuid::Uuid),
    /// Orders are not exactly `1..=N`.
    OrderNotDense { expected: i64, found: i64 },
    /// Number of default sections is not exactly one.
    DefaultCount(usize),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ForeignSection(id) => write!(f, "section does not belong to snapshot: {id}"),
            Self::ForeignItem(id) => write!(f, "item does not belong to snapshot owner: {id}"),
            Self::MisplacedItem {
                item_id,
                section_id,
            } => write!(f, "item {item_id} listed under section {section_id} it does not reference"),
            Self::Duplicate(id) => write!(f, "duplicate snapshot entry: {id}"),
            Self::OrderNotDense { expected, found } => {
                write!(f, "section order gap: expected {expected}, found {found}")
            }
            Self::DefaultCount(count) => {
                write!(f, "expected exactly one default section, found {count}")
            }
        }
    }
}

impl Error for SnapshotError {}

#[derive(Debug, PartialEq)]
struct SnapshotState<K> {
    owner_id: OwnerId,
    scope: Scope,
    buckets: Vec<SectionBucket<K>>,
}

/// Shared immutable snapshot handle.
///
/// Cloning is cheap and keeps reference identity.
#[derive(Debug)]
pub struct Snapshot<K> {
    state: Arc<SnapshotState<K>>,
}

impl<K> Clone for Snapshot<K> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<K: PartialEq> PartialEq for Snapshot<K> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state) || self.state == other.state
    }
}

impl<K: SectionedItem> Snapshot<K> {
    /// Validates and sorts store input into a snapshot.
    pub fn new(
        owner_id: OwnerId,
        mut buckets: Vec<SectionBucket<K>>,
    ) -> Result<Self, SnapshotError> {
        buckets.sort_by(|left, right| {
            left.section
                .sort_order
                .cmp(&right.section.sort_order)
                .then_with(|| left.section.section_id.cmp(&right.section.section_id))
        });
        validate_buckets(owner_id, &buckets)?;
        Ok(Self::from_sorted(owner_id, buckets))
    }

    /// Empty snapshot for an owner with no sections yet.
    pub fn empty(owner_id: OwnerId) -> Self {
        Self::from_sorted(owner_id, Vec::new())
    }

    /// Builds a snapshot from buckets already known to satisfy the invariants.
    pub(crate) fn from_sorted(owner_id: OwnerId, buckets: Vec<SectionBucket<K>>) -> Self {
        Self {
            state: Arc::new(SnapshotState {
                owner_id,
                scope: K::SCOPE,
                buckets,
            }),
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.state.owner_id
    }

    pub fn scope(&self) -> Scope {
        self.state.scope
    }

    /// Buckets in rendered order.
    pub fn buckets(&self) -> &[SectionBucket<K>] {
        &self.state.buckets
    }

    /// Sections in rendered order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> + '_ {
        self.state.buckets.iter().map(|bucket| &bucket.section)
    }

    pub fn section_index(&self, section_id: SectionId) -> Option<usize> {
        self.state
            .buckets
            .iter()
            .position(|bucket| bucket.section_id() == section_id)
    }

    pub fn bucket(&self, section_id: SectionId) -> Option<&SectionBucket<K>> {
        self.state
            .buckets
            .iter()
            .find(|bucket| bucket.section_id() == section_id)
    }

    /// Finds the bucket index and item index of one item.
    pub fn locate_item(&self, item_id: ItemId) -> Option<(usize, usize)> {
        self.state
            .buckets
            .iter()
            .enumerate()
            .find_map(|(bucket_index, bucket)| {
                bucket
                    .items
                    .iter()
                    .position(|item| item.item_id() == item_id)
                    .map(|item_index| (bucket_index, item_index))
            })
    }

    pub fn default_section(&self) -> Option<&Section> {
        self.sections().find(|section| section.is_default)
    }

    pub fn item_count(&self) -> usize {
        self.state.buckets.iter().map(|bucket| bucket.items.len()).sum()
    }

    /// Returns whether both handles point at the same snapshot.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Checks the ordering and ownership invariants.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        validate_buckets(self.state.owner_id, &self.state.buckets)
    }
}

fn validate_buckets<K: SectionedItem>(
    owner_id: OwnerId,
    buckets: &[SectionBucket<K>],
) -> Result<(), SnapshotError> {
    let mut seen = HashSet::new();
    let mut defaults = 0usize;

    for (index, bucket) in buckets.iter().enumerate() {
        let section = &bucket.section;
        if section.owner_id != owner_id || section.scope != K::SCOPE {
            return Err(SnapshotError::ForeignSection(section.section_id));
        }
        if !seen.insert(section.section_id) {
            return Err(SnapshotError::Duplicate(section.section_id));
        }
        let expected = index as i64 + 1;
        if section.sort_order != expected {
            return Err(SnapshotError::OrderNotDense {
                expected,
                found: section.sort_order,
            });
        }
        if section.is_default {
            defaults += 1;
        }

        for item in &bucket.items {
            if item.owner_id() != owner_id {
                return Err(SnapshotError::ForeignItem(item.item_id()));
            }
            if item.section_id() != section.section_id {
                return Err(SnapshotError::MisplacedItem {
                    item_id: item.item_id(),
                    section_id: section.section_id,
                });
            }
            if !seen.insert(item.item_id()) {
                return Err(SnapshotError::Duplicate(item.item_id()));
            }
        }
    }

    if !buckets.is_empty() && defaults != 1 {
        return Err(SnapshotError::DefaultCount(defaults));
    }
    Ok(())
}
