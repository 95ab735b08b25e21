//! Section board use-case service.
//!
//! # Responsibility
//! - Validate user input above the repository layer.
//! - Provide section create/rename/delete/set-default and item creation.
//! - Load validated snapshots for the drag controller.
//!
//! # Invariants
//! - Every scope in use has a default section before items are placed in it.
//! - Snapshots handed out are re-sorted and invariant-checked.

use crate::model::item::{Classroom, ItemId, Membership};
use crate::model::section::{
    normalize_display_name, normalize_icon, OwnerId, Scope, Section, SectionId,
    SectionValidationError,
};
use crate::model::snapshot::{Snapshot, SnapshotError};
use crate::repo::section_repo::{
    OrderStoreError, SectionDeletion, SectionRepository, StoredItem,
};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Name given to the section created when a scope has none.
pub fn default_section_name(scope: Scope) -> &'static str {
    match scope {
        Scope::Creation => "My classrooms",
        Scope::Membership => "Joined classrooms",
    }
}

/// Errors from board service operations.
#[derive(Debug)]
pub enum BoardServiceError {
    /// User-provided metadata is invalid.
    Validation(SectionValidationError),
    SectionNotFound(SectionId),
    ItemNotFound(ItemId),
    /// Actor does not own the target.
    Forbidden(Uuid),
    /// Target section belongs to the other scope.
    WrongScope(SectionId),
    DefaultSectionUndeletable(SectionId),
    /// Store returned data that violates snapshot invariants.
    Snapshot(SnapshotError),
    /// Repository-level failure.
    Store(OrderStoreError),
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Forbidden(id) => write!(f, "not allowed to modify {id}"),
            Self::WrongScope(id) => write!(f, "section {id} belongs to another scope"),
            Self::DefaultSectionUndeletable(id) => {
                write!(f, "default section cannot be deleted: {id}")
            }
            Self::Snapshot(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Snapshot(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OrderStoreError> for BoardServiceError {
    fn from(value: OrderStoreError) -> Self {
        match value {
            OrderStoreError::SectionNotFound(id) => Self::SectionNotFound(id),
            OrderStoreError::ItemNotFound(id) => Self::ItemNotFound(id),
            OrderStoreError::Forbidden { entity, .. } => Self::Forbidden(entity),
            OrderStoreError::ScopeMismatch { section_id, .. } => Self::WrongScope(section_id),
            OrderStoreError::DefaultSectionUndeletable(id) => Self::DefaultSectionUndeletable(id),
            other => Self::Store(other),
        }
    }
}

impl From<SectionValidationError> for BoardServiceError {
    fn from(value: SectionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<SnapshotError> for BoardServiceError {
    fn from(value: SnapshotError) -> Self {
        Self::Snapshot(value)
    }
}

/// Section board service facade.
pub struct BoardService<R: SectionRepository> {
    repo: R,
}

impl<R: SectionRepository> BoardService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut R {
        &mut self.repo
    }

    pub fn into_repo(self) -> R {
        self.repo
    }

    /// Creates one section at the end of its scope.
    pub fn create_section(
        &mut self,
        owner_id: OwnerId,
        scope: Scope,
        display_name: &str,
        icon: Option<&str>,
    ) -> Result<Section, BoardServiceError> {
        let name = normalize_display_name(display_name)?;
        let icon = normalize_icon(icon)?;
        self.repo
            .create_section(owner_id, scope, &name, icon.as_deref())
            .map_err(Into::into)
    }

    /// Returns the default section of a scope, creating one if the scope is
    /// empty.
    pub fn ensure_default_section(
        &mut self,
        owner_id: OwnerId,
        scope: Scope,
    ) -> Result<Section, BoardServiceError> {
        let sections = self.repo.list_sections(owner_id, scope)?;
        if let Some(section) = sections.into_iter().find(|section| section.is_default) {
            return Ok(section);
        }
        let created =
            self.repo
                .create_section(owner_id, scope, default_section_name(scope), None)?;
        if !created.is_default {
            return Err(OrderStoreError::MissingDefaultSection { owner_id, scope }.into());
        }
        info!(
            "event=default_section_bootstrap module=service status=ok scope={}",
            scope.as_str()
        );
        Ok(created)
    }

    /// Renames one section and replaces its icon.
    pub fn update_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
        display_name: &str,
        icon: Option<&str>,
    ) -> Result<Section, BoardServiceError> {
        let name = normalize_display_name(display_name)?;
        let icon = normalize_icon(icon)?;
        self.repo
            .update_section(actor, section_id, &name, icon.as_deref())
            .map_err(Into::into)
    }

    /// Makes one section the scope default.
    pub fn set_default_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
    ) -> Result<(), BoardServiceError> {
        self.repo
            .set_default_section(actor, section_id)
            .map_err(Into::into)
    }

    /// Deletes one non-default section, moving its items to the default.
    pub fn delete_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
    ) -> Result<SectionDeletion, BoardServiceError> {
        self.repo
            .delete_section(actor, section_id)
            .map_err(Into::into)
    }

    /// Creates a classroom, placing it in the default section when `section_id`
    /// is `None`.
    pub fn create_classroom(
        &mut self,
        owner_id: OwnerId,
        section_id: Option<SectionId>,
        name: &str,
        subject: Option<&str>,
    ) -> Result<Classroom, BoardServiceError> {
        let name = normalize_display_name(name)?;
        let section_id = self.resolve_section(owner_id, Scope::Creation, section_id)?;
        let subject = normalize_detail(subject);
        self.repo
            .create_classroom(owner_id, section_id, &name, subject.as_deref())
            .map_err(Into::into)
    }

    /// Records that `member_id` joined a classroom.
    pub fn join_classroom(
        &mut self,
        member_id: OwnerId,
        section_id: Option<SectionId>,
        classroom_name: &str,
        teacher_name: Option<&str>,
    ) -> Result<Membership, BoardServiceError> {
        let classroom_name = normalize_display_name(classroom_name)?;
        let section_id = self.resolve_section(member_id, Scope::Membership, section_id)?;
        let teacher_name = normalize_detail(teacher_name);
        self.repo
            .create_membership(
                member_id,
                section_id,
                &classroom_name,
                teacher_name.as_deref(),
            )
            .map_err(Into::into)
    }

    /// Loads the owner's sections of `K::SCOPE` as a validated snapshot.
    pub fn load_snapshot<K: StoredItem>(
        &self,
        owner_id: OwnerId,
    ) -> Result<Snapshot<K>, BoardServiceError> {
        let buckets = self.repo.load_buckets::<K>(owner_id)?;
        Snapshot::new(owner_id, buckets).map_err(Into::into)
    }

    fn resolve_section(
        &mut self,
        owner_id: OwnerId,
        scope: Scope,
        section_id: Option<SectionId>,
    ) -> Result<SectionId, BoardServiceError> {
        match section_id {
            Some(section_id) => Ok(section_id),
            None => Ok(self.ensure_default_section(owner_id, scope)?.section_id),
        }
    }
}

fn normalize_detail(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
