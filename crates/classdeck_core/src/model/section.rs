//! Section (ordered container) domain model.
//!
//! # Responsibility
//! - Define the canonical section record shared by both ordering scopes.
//! - Normalize and validate user-provided section metadata.
//!
//! # Invariants
//! - `sort_order` is 1-based and dense within one (owner, scope) partition.
//! - Exactly one section per (owner, scope) carries `is_default = true`.
//! - `display_name` is trimmed and never blank.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable section identifier.
pub type SectionId = Uuid;

/// Stable identifier of the user owning sections and items.
pub type OwnerId = Uuid;

/// Maximum accepted display name length, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 120;

static ICON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]{0,47}$").expect("valid icon regex"));

/// Ordering partition of one owner's sections.
///
/// Orders are unique only within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    /// Sections grouping classrooms the owner created.
    Creation,
    /// Sections grouping classrooms the owner joined.
    Membership,
}

impl Scope {
    /// Stable persisted value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creation => "creation",
            Self::Membership => "membership",
        }
    }

    /// Parses the persisted value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "creation" => Some(Self::Creation),
            "membership" => Some(Self::Membership),
            _ => None,
        }
    }

    /// Table holding the items grouped by sections of this scope.
    pub fn item_table(self) -> &'static str {
        match self {
            Self::Creation => "classrooms",
            Self::Membership => "memberships",
        }
    }
}

/// Canonical section record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub section_id: SectionId,
    pub owner_id: OwnerId,
    pub scope: Scope,
    pub display_name: String,
    /// Icon reference resolved by the presentation layer.
    pub icon: Option<String>,
    pub is_default: bool,
    /// 1-based position within (owner, scope).
    pub sort_order: i64,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

/// Validation errors for user-provided section metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionValidationError {
    /// Display name is blank after trim.
    BlankDisplayName,
    /// Display name exceeds [`MAX_DISPLAY_NAME_CHARS`].
    DisplayNameTooLong(usize),
    /// Icon reference does not match the accepted token shape.
    InvalidIcon(String),
}

impl Display for SectionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankDisplayName => write!(f, "display name must not be blank"),
            Self::DisplayNameTooLong(len) => write!(
                f,
                "display name has {len} characters; at most {MAX_DISPLAY_NAME_CHARS} allowed"
            ),
            Self::InvalidIcon(value) => write!(f, "invalid icon reference `{value}`"),
        }
    }
}

impl Error for SectionValidationError {}

/// Trims a display name and rejects blank or oversized values.
pub fn normalize_display_name(value: &str) -> Result<String, SectionValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SectionValidationError::BlankDisplayName);
    }
    let len = trimmed.chars().count();
    if len > MAX_DISPLAY_NAME_CHARS {
        return Err(SectionValidationError::DisplayNameTooLong(len));
    }
    Ok(trimmed.to_string())
}

/// Normalizes an optional icon reference.
///
/// Blank input maps to `None`; non-blank input must be a lowercase token.
pub fn normalize_icon(value: Option<&str>) -> Result<Option<String>, SectionValidationError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !ICON_RE.is_match(trimmed) {
        return Err(SectionValidationError::InvalidIcon(trimmed.to_string()));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{normalize_display_name, normalize_icon, Scope, SectionValidationError};

    #[test]
    fn display_name_is_trimmed_and_blank_rejected() {
        assert_eq!(normalize_display_name("  Period 3 ").unwrap(), "Period 3");
        assert_eq!(
            normalize_display_name(" \t").unwrap_err(),
            SectionValidationError::BlankDisplayName
        );
        let long = "x".repeat(121);
        assert_eq!(
            normalize_display_name(&long).unwrap_err(),
            SectionValidationError::DisplayNameTooLong(121)
        );
    }

    #[test]
    fn icon_accepts_tokens_and_drops_blank() {
        assert_eq!(normalize_icon(None).unwrap(), None);
        assert_eq!(normalize_icon(Some("  ")).unwrap(), None);
        assert_eq!(
            normalize_icon(Some("book-open")).unwrap().as_deref(),
            Some("book-open")
        );
        assert!(matches!(
            normalize_icon(Some("../etc/passwd")),
            Err(SectionValidationError::InvalidIcon(_))
        ));
    }

    #[test]
    fn scope_round_trips_persisted_value() {
        for scope in [Scope::Creation, Scope::Membership] {
            assert_eq!(Scope::parse(scope.as_str()), Some(scope));
        }
        assert_eq!(Scope::parse("other"), None);
    }
}
