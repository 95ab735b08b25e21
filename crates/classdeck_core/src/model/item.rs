//! Movable items grouped by sections.
//!
//! Created classrooms and classroom memberships follow the same ordering
//! contract. The engine only needs the [`SectionedItem`] capability set, so
//! both kinds share one implementation of the mutator and drag controller.

use crate::model::section::{OwnerId, Scope, SectionId};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use uuid::Uuid;

/// Stable item identifier.
pub type ItemId = Uuid;

/// Capability set the ordering engine needs from an item kind.
pub trait SectionedItem: Clone + Debug + PartialEq {
    /// Scope whose sections group this kind.
    const SCOPE: Scope;

    fn item_id(&self) -> ItemId;
    fn owner_id(&self) -> OwnerId;
    fn section_id(&self) -> SectionId;
    fn set_section_id(&mut self, section_id: SectionId);
}

/// A classroom the owner created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub classroom_id: ItemId,
    pub owner_id: OwnerId,
    pub section_id: SectionId,
    pub name: String,
    pub subject: Option<String>,
    /// Epoch ms. Drives display order inside a section.
    pub created_at: i64,
}

impl SectionedItem for Classroom {
    const SCOPE: Scope = Scope::Creation;

    fn item_id(&self) -> ItemId {
        self.classroom_id
    }

    fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    fn section_id(&self) -> SectionId {
        self.section_id
    }

    fn set_section_id(&mut self, section_id: SectionId) {
        self.section_id = section_id;
    }
}

/// A classroom the owner joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub membership_id: ItemId,
    /// Joining user; owns the membership's placement.
    pub member_id: OwnerId,
    pub section_id: SectionId,
    pub classroom_name: String,
    pub teacher_name: Option<String>,
    /// Epoch ms.
    pub created_at: i64,
}

impl SectionedItem for Membership {
    const SCOPE: Scope = Scope::Membership;

    fn item_id(&self) -> ItemId {
        self.membership_id
    }

    fn owner_id(&self) -> OwnerId {
        self.member_id
    }

    fn section_id(&self) -> SectionId {
        self.section_id
    }

    fn set_section_id(&mut self, section_id: SectionId) {
        self.section_id = section_id;
    }
}
