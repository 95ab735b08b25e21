//! Order store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist sections and the items they group.
//! - Apply move/reorder requests atomically and authorize them against the
//!   acting owner.
//!
//! # Invariants
//! - Section orders stay dense (`1..=N`) per (owner, scope) after every commit.
//! - Order-mutating writes run inside `BEGIN IMMEDIATE` transactions, which
//!   serializes them per database.
//! - Order `0` is only ever held transiently inside a reorder transaction.
//! - Item listing is deterministic: `created_at ASC, rowid ASC`.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::item::{Classroom, ItemId, Membership, SectionedItem};
use crate::model::request::{MoveRequest, ReorderRequest, ShiftDirection, ShiftEntry};
use crate::model::section::{OwnerId, Scope, Section, SectionId};
use crate::model::snapshot::SectionBucket;
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use uuid::Uuid;

/// Parking slot for the active section during a reorder.
const SENTINEL_ORDER: i64 = 0;

const SECTION_SELECT_SQL: &str = "SELECT
    section_uuid,
    owner_uuid,
    scope,
    display_name,
    icon,
    is_default,
    sort_order,
    created_at,
    updated_at
FROM sections";

/// Result type used by order store operations.
pub type StoreResult<T> = Result<T, OrderStoreError>;

/// Errors from order store operations.
#[derive(Debug)]
pub enum OrderStoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    SectionNotFound(SectionId),
    ItemNotFound(ItemId),
    /// Entity exists but belongs to another owner.
    Forbidden { actor: OwnerId, entity: Uuid },
    /// Section lives in a different scope than the request expects.
    ScopeMismatch {
        section_id: SectionId,
        expected: Scope,
        actual: Scope,
    },
    /// The default section cannot be deleted.
    DefaultSectionUndeletable(SectionId),
    /// Scope has sections but none is default.
    MissingDefaultSection { owner_id: OwnerId, scope: Scope },
    /// Reorder request does not match persisted orders.
    StaleShiftSet(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl OrderStoreError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Db(_) => "db_error",
            Self::SectionNotFound(_) => "section_not_found",
            Self::ItemNotFound(_) => "item_not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::ScopeMismatch { .. } => "scope_mismatch",
            Self::DefaultSectionUndeletable(_) => "default_section_undeletable",
            Self::MissingDefaultSection { .. } => "missing_default_section",
            Self::StaleShiftSet(_) => "stale_shift_set",
            Self::UninitializedConnection { .. } => "uninitialized_connection",
            Self::MissingRequiredTable(_) => "missing_required_table",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for OrderStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Forbidden { actor, entity } => {
                write!(f, "owner {actor} may not modify {entity}")
            }
            Self::ScopeMismatch {
                section_id,
                expected,
                actual,
            } => write!(
                f,
                "section {section_id} is in scope `{}`, expected `{}`",
                actual.as_str(),
                expected.as_str()
            ),
            Self::DefaultSectionUndeletable(id) => {
                write!(f, "default section cannot be deleted: {id}")
            }
            Self::MissingDefaultSection { owner_id, scope } => write!(
                f,
                "owner {owner_id} has no default section in scope `{}`",
                scope.as_str()
            ),
            Self::StaleShiftSet(message) => write!(f, "stale shift set: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "order store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "order store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid order store data: {message}"),
        }
    }
}

impl Error for OrderStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for OrderStoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for OrderStoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable side of the reconciliation channel.
///
/// Implementations are the sole authority on ownership: `actor` is the
/// authenticated user on whose behalf the request runs.
pub trait OrderStore {
    /// Moves one item into another section. Re-applying is a no-op.
    fn apply_move(&mut self, actor: OwnerId, request: &MoveRequest) -> StoreResult<()>;
    /// Applies one section reorder as a single transaction.
    fn apply_reorder(&mut self, actor: OwnerId, request: &ReorderRequest) -> StoreResult<()>;
}

/// Section lifecycle and snapshot queries.
pub trait SectionRepository {
    fn create_section(
        &mut self,
        owner_id: OwnerId,
        scope: Scope,
        display_name: &str,
        icon: Option<&str>,
    ) -> StoreResult<Section>;
    fn get_section(&self, section_id: SectionId) -> StoreResult<Option<Section>>;
    fn list_sections(&self, owner_id: OwnerId, scope: Scope) -> StoreResult<Vec<Section>>;
    fn update_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
        display_name: &str,
        icon: Option<&str>,
    ) -> StoreResult<Section>;
    fn set_default_section(&mut self, actor: OwnerId, section_id: SectionId) -> StoreResult<()>;
    fn delete_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
    ) -> StoreResult<SectionDeletion>;
    fn create_classroom(
        &mut self,
        owner_id: OwnerId,
        section_id: SectionId,
        name: &str,
        subject: Option<&str>,
    ) -> StoreResult<Classroom>;
    fn create_membership(
        &mut self,
        member_id: OwnerId,
        section_id: SectionId,
        classroom_name: &str,
        teacher_name: Option<&str>,
    ) -> StoreResult<Membership>;
    /// Loads one owner's sections of `K::SCOPE` with their nested items.
    fn load_buckets<K: StoredItem>(&self, owner_id: OwnerId)
        -> StoreResult<Vec<SectionBucket<K>>>;
}

/// Flat item row shared by both item tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub item_id: ItemId,
    pub owner_id: OwnerId,
    pub section_id: SectionId,
    pub display_name: String,
    pub detail: Option<String>,
    pub created_at: i64,
}

/// Item kinds the SQLite store knows how to load.
pub trait StoredItem: SectionedItem {
    fn from_record(record: ItemRecord) -> Self;
}

impl StoredItem for Classroom {
    fn from_record(record: ItemRecord) -> Self {
        Self {
            classroom_id: record.item_id,
            owner_id: record.owner_id,
            section_id: record.section_id,
            name: record.display_name,
            subject: record.detail,
            created_at: record.created_at,
        }
    }
}

impl StoredItem for Membership {
    fn from_record(record: ItemRecord) -> Self {
        Self {
            membership_id: record.item_id,
            member_id: record.owner_id,
            section_id: record.section_id,
            classroom_name: record.display_name,
            teacher_name: record.detail,
            created_at: record.created_at,
        }
    }
}

/// Outcome of deleting one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDeletion {
    /// Section that received the deleted section's items.
    pub default_section_id: SectionId,
    pub reassigned_items: usize,
    /// Number of later siblings whose order was decremented.
    pub compacted_sections: usize,
}

/// SQLite-backed order store.
///
/// Owns its connection so it can be handed to a reconciliation worker thread.
pub struct SqliteOrderStore {
    conn: Connection,
}

impl SqliteOrderStore {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh migrated in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Read access for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Loads one item of kind `K`.
    pub fn get_item<K: StoredItem>(&self, item_id: ItemId) -> StoreResult<Option<K>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT item_uuid, owner_uuid, section_uuid, display_name, detail, created_at
             FROM {}
             WHERE item_uuid = ?1;",
            K::SCOPE.item_table()
        ))?;
        let mut rows = stmt.query([item_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(K::from_record(parse_item_row(row)?)));
        }
        Ok(None)
    }

    /// Lists one owner's items of kind `K`.
    pub fn list_items<K: StoredItem>(&self, owner_id: OwnerId) -> StoreResult<Vec<K>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT item_uuid, owner_uuid, section_uuid, display_name, detail, created_at
             FROM {}
             WHERE owner_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
            K::SCOPE.item_table()
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(K::from_record(parse_item_row(row)?));
        }
        Ok(items)
    }


    fn insert_item<K: StoredItem>(
        &mut self,
        owner_id: OwnerId,
        section_id: SectionId,
        display_name: &str,
        detail: Option<&str>,
    ) -> StoreResult<K> {
        let item_id = Uuid::new_v4();
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;
        let section = load_owned_section(&tx, owner_id, section_id)?;
        ensure_scope(&section, K::SCOPE)?;
        tx.execute(
            &format!(
                "INSERT INTO {} (item_uuid, owner_uuid, section_uuid, display_name, detail)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                K::SCOPE.item_table()
            ),
            params![
                item_id.to_string(),
                owner_id.to_string(),
                section_id.to_string(),
                display_name,
                detail,
            ],
        )?;
        tx.commit()?;

        self.get_item::<K>(item_id)?
            .ok_or(OrderStoreError::ItemNotFound(item_id))
    }
}

impl SectionRepository for SqliteOrderStore {
    /// Creates one section at the end of its scope.
    ///
    /// The first section of a scope becomes its default.
    fn create_section(
        &mut self,
        owner_id: OwnerId,
        scope: Scope,
        display_name: &str,
        icon: Option<&str>,
    ) -> StoreResult<Section> {
        let section_id = Uuid::new_v4();
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;
        let sort_order = next_sort_order(&tx, owner_id, scope)?;
        let has_default = find_default_section_id(&tx, owner_id, scope)?.is_some();
        tx.execute(
            "INSERT INTO sections (
                section_uuid,
                owner_uuid,
                scope,
                display_name,
                icon,
                is_default,
                sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                section_id.to_string(),
                owner_id.to_string(),
                scope.as_str(),
                display_name,
                icon,
                i64::from(!has_default),
                sort_order,
            ],
        )?;
        let section = load_required_section(&tx, section_id)?;
        tx.commit()?;

        info!(
            "event=section_create module=store status=ok scope={} sort_order={} is_default={}",
            scope.as_str(),
            section.sort_order,
            section.is_default
        );
        Ok(section)
    }

    /// Loads one section by id.
    fn get_section(&self, section_id: SectionId) -> StoreResult<Option<Section>> {
        load_section(&self.conn, section_id)
    }

    /// Lists one owner's sections in a scope, ordered by `sort_order`.
    fn list_sections(&self, owner_id: OwnerId, scope: Scope) -> StoreResult<Vec<Section>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SECTION_SELECT_SQL}
             WHERE owner_uuid = ?1 AND scope = ?2
             ORDER BY sort_order ASC, section_uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![owner_id.to_string(), scope.as_str()])?;
        let mut sections = Vec::new();
        while let Some(row) = rows.next()? {
            sections.push(parse_section_row(row)?);
        }
        Ok(sections)
    }

    /// Updates display name and icon of one section.
    fn update_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
        display_name: &str,
        icon: Option<&str>,
    ) -> StoreResult<Section> {
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;
        let section = load_owned_section(&tx, actor, section_id)?;
        tx.execute(
            "UPDATE sections
             SET display_name = ?2,
                 icon = ?3,
                 updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
             WHERE section_uuid = ?1;",
            params![section.section_id.to_string(), display_name, icon],
        )?;
        let updated = load_required_section(&tx, section_id)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Promotes one section to default, demoting the previous default.
    fn set_default_section(&mut self, actor: OwnerId, section_id: SectionId) -> StoreResult<()> {
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;
        let section = load_owned_section(&tx, actor, section_id)?;
        if section.is_default {
            return Ok(());
        }
        tx.execute(
            "UPDATE sections
             SET is_default = 0,
                 updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
             WHERE owner_uuid = ?1 AND scope = ?2 AND is_default = 1;",
            params![section.owner_id.to_string(), section.scope.as_str()],
        )?;
        tx.execute(
            "UPDATE sections
             SET is_default = 1,
                 updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
             WHERE section_uuid = ?1;",
            [section_id.to_string()],
        )?;
        tx.commit()?;

        info!(
            "event=section_set_default module=store status=ok scope={}",
            section.scope.as_str()
        );
        Ok(())
    }

    /// Deletes one non-default section.
    ///
    /// Its items move to the scope's default section and later siblings are
    /// compacted so orders stay dense.
    fn delete_section(
        &mut self,
        actor: OwnerId,
        section_id: SectionId,
    ) -> StoreResult<SectionDeletion> {
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;
        let section = load_owned_section(&tx, actor, section_id)?;
        if section.is_default {
            return Err(OrderStoreError::DefaultSectionUndeletable(section_id));
        }
        let default_section_id = find_default_section_id(&tx, section.owner_id, section.scope)?
            .ok_or(OrderStoreError::MissingDefaultSection {
                owner_id: section.owner_id,
                scope: section.scope,
            })?;

        let reassigned_items = tx.execute(
            &format!(
                "UPDATE {}
                 SET section_uuid = ?2,
                     updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
                 WHERE section_uuid = ?1;",
                section.scope.item_table()
            ),
            params![section_id.to_string(), default_section_id.to_string()],
        )?;

        tx.execute(
            "DELETE FROM sections WHERE section_uuid = ?1;",
            [section_id.to_string()],
        )?;

        let later = list_section_orders_after(&tx, &section)?;
        for (later_id, order) in &later {
            set_sort_order(&tx, *later_id, order - 1)?;
        }
        tx.commit()?;

        info!(
            "event=section_delete module=store status=ok scope={} reassigned_items={} compacted_sections={}",
            section.scope.as_str(),
            reassigned_items,
            later.len()
        );
        Ok(SectionDeletion {
            default_section_id,
            reassigned_items,
            compacted_sections: later.len(),
        })
    }

    /// Creates one classroom inside an owned creation-scope section.
    fn create_classroom(
        &mut self,
        owner_id: OwnerId,
        section_id: SectionId,
        name: &str,
        subject: Option<&str>,
    ) -> StoreResult<Classroom> {
        self.insert_item(owner_id, section_id, name, subject)
    }

    /// Creates one membership inside an owned membership-scope section.
    fn create_membership(
        &mut self,
        member_id: OwnerId,
        section_id: SectionId,
        classroom_name: &str,
        teacher_name: Option<&str>,
    ) -> StoreResult<Membership> {
        self.insert_item(member_id, section_id, classroom_name, teacher_name)
    }

    /// Loads one owner's sections of `K::SCOPE` with their nested items.
    fn load_buckets<K: StoredItem>(
        &self,
        owner_id: OwnerId,
    ) -> StoreResult<Vec<SectionBucket<K>>> {
        let sections = self.list_sections(owner_id, K::SCOPE)?;
        let mut grouped: HashMap<SectionId, Vec<K>> = HashMap::new();
        for item in self.list_items::<K>(owner_id)? {
            grouped.entry(item.section_id()).or_default().push(item);
        }

        let buckets: Vec<SectionBucket<K>> = sections
            .into_iter()
            .map(|section| {
                let items = grouped.remove(&section.section_id).unwrap_or_default();
                SectionBucket::new(section, items)
            })
            .collect();

        if let Some(orphan_section) = grouped.keys().next() {
            return Err(OrderStoreError::InvalidData(format!(
                "items reference section {orphan_section} outside owner scope"
            )));
        }
        Ok(buckets)
    }
}

impl OrderStore for SqliteOrderStore {
    fn apply_move(&mut self, actor: OwnerId, request: &MoveRequest) -> StoreResult<()> {
        let table = request.scope.item_table();
        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;

        let current: Option<(String, String)> = tx
            .query_row(
                &format!("SELECT owner_uuid, section_uuid FROM {table} WHERE item_uuid = ?1;"),
                [request.item_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((owner_text, section_text)) = current else {
            return Err(OrderStoreError::ItemNotFound(request.item_id));
        };
        if parse_uuid(&owner_text, "items.owner_uuid")? != actor {
            return Err(OrderStoreError::Forbidden {
                actor,
                entity: request.item_id,
            });
        }

        let target = load_owned_section(&tx, actor, request.section_id)?;
        ensure_scope(&target, request.scope)?;

        if parse_uuid(&section_text, "items.section_uuid")? == request.section_id {
            return Ok(());
        }

        tx.execute(
            &format!(
                "UPDATE {table}
                 SET section_uuid = ?2,
                     updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
                 WHERE item_uuid = ?1;"
            ),
            params![request.item_id.to_string(), request.section_id.to_string()],
        )?;
        tx.commit()?;

        info!(
            "event=item_move module=store status=ok scope={}",
            request.scope.as_str()
        );
        Ok(())
    }

    fn apply_reorder(&mut self, actor: OwnerId, request: &ReorderRequest) -> StoreResult<()> {
        if request.active_section_id == request.over_section_id {
            return Err(OrderStoreError::StaleShiftSet(
                "active and over section are the same".to_string(),
            ));
        }

        let tx = Transaction::new(&mut self.conn, TransactionBehavior::Immediate)?;
        let active = load_owned_section(&tx, actor, request.active_section_id)?;
        let over = load_owned_section(&tx, actor, request.over_section_id)?;
        ensure_scope(&over, active.scope)?;

        let expected = expected_shift_orders(active.sort_order, over.sort_order, request.direction)
            .ok_or_else(|| {
                OrderStoreError::StaleShiftSet(format!(
                    "direction {} does not match persisted orders {} -> {}",
                    request.direction.as_str(),
                    active.sort_order,
                    over.sort_order
                ))
            })?;

        let mut entries: Vec<ShiftEntry> = request.shift_set.clone();
        entries.sort_by_key(|entry| entry.order);
        let requested: Vec<i64> = entries.iter().map(|entry| entry.order).collect();
        if requested != expected {
            return Err(OrderStoreError::StaleShiftSet(format!(
                "shift set orders {requested:?} do not cover {expected:?}"
            )));
        }
        for entry in &entries {
            let sibling = load_owned_section(&tx, actor, entry.section_id)?;
            ensure_scope(&sibling, active.scope)?;
            if sibling.sort_order != entry.order || sibling.section_id == active.section_id {
                return Err(OrderStoreError::StaleShiftSet(format!(
                    "section {} is at order {}, request expected {}",
                    sibling.section_id, sibling.sort_order, entry.order
                )));
            }
        }

        // Shifting toward the freed slot first keeps every intermediate state
        // free of duplicate orders.
        if request.direction == ShiftDirection::Down {
            entries.reverse();
        }
        set_sort_order(&tx, active.section_id, SENTINEL_ORDER)?;
        for entry in &entries {
            set_sort_order(&tx, entry.section_id, entry.shifted_order(request.direction))?;
        }
        set_sort_order(&tx, active.section_id, over.sort_order)?;
        tx.commit()?;

        info!(
            "event=section_reorder module=store status=ok scope={} direction={} shifted={}",
            active.scope.as_str(),
            request.direction.as_str(),
            entries.len()
        );
        Ok(())
    }
}

/// Orders the shift set must cover, or `None` when `direction` contradicts
/// the persisted positions.
fn expected_shift_orders(
    active_order: i64,
    over_order: i64,
    direction: ShiftDirection,
) -> Option<Vec<i64>> {
    match direction {
        ShiftDirection::Up if active_order < over_order => {
            Some((active_order + 1..=over_order).collect())
        }
        ShiftDirection::Down if active_order > over_order => {
            Some((over_order..active_order).collect())
        }
        _ => None,
    }
}

fn load_section(conn: &Connection, section_id: SectionId) -> StoreResult<Option<Section>> {
    let mut stmt = conn.prepare(&format!("{SECTION_SELECT_SQL} WHERE section_uuid = ?1;"))?;
    let mut rows = stmt.query([section_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_section_row(row)?));
    }
    Ok(None)
}

fn load_required_section(conn: &Connection, section_id: SectionId) -> StoreResult<Section> {
    load_section(conn, section_id)?.ok_or(OrderStoreError::SectionNotFound(section_id))
}

fn load_owned_section(
    conn: &Connection,
    actor: OwnerId,
    section_id: SectionId,
) -> StoreResult<Section> {
    let section = load_required_section(conn, section_id)?;
    if section.owner_id != actor {
        warn!("event=store_authorize module=store status=error error_code=forbidden kind=section");
        return Err(OrderStoreError::Forbidden {
            actor,
            entity: section_id,
        });
    }
    Ok(section)
}

fn ensure_scope(section: &Section, expected: Scope) -> StoreResult<()> {
    if section.scope != expected {
        return Err(OrderStoreError::ScopeMismatch {
            section_id: section.section_id,
            expected,
            actual: section.scope,
        });
    }
    Ok(())
}

fn find_default_section_id(
    conn: &Connection,
    owner_id: OwnerId,
    scope: Scope,
) -> StoreResult<Option<SectionId>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT section_uuid
             FROM sections
             WHERE owner_uuid = ?1 AND scope = ?2 AND is_default = 1;",
            params![owner_id.to_string(), scope.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    value
        .map(|text| parse_uuid(&text, "sections.section_uuid"))
        .transpose()
}

fn next_sort_order(conn: &Connection, owner_id: OwnerId, scope: Scope) -> StoreResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), 0) + 1
         FROM sections
         WHERE owner_uuid = ?1 AND scope = ?2;",
        params![owner_id.to_string(), scope.as_str()],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn list_section_orders_after(
    conn: &Connection,
    section: &Section,
) -> StoreResult<Vec<(SectionId, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT section_uuid, sort_order
         FROM sections
         WHERE owner_uuid = ?1 AND scope = ?2 AND sort_order > ?3
         ORDER BY sort_order ASC;",
    )?;
    let mut rows = stmt.query(params![
        section.owner_id.to_string(),
        section.scope.as_str(),
        section.sort_order
    ])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get(0)?;
        result.push((parse_uuid(&id_text, "sections.section_uuid")?, row.get(1)?));
    }
    Ok(result)
}

fn set_sort_order(conn: &Connection, section_id: SectionId, sort_order: i64) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE sections
         SET sort_order = ?2,
             updated_at = CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)
         WHERE section_uuid = ?1;",
        params![section_id.to_string(), sort_order],
    )?;
    if changed == 0 {
        return Err(OrderStoreError::SectionNotFound(section_id));
    }
    Ok(())
}

fn parse_section_row(row: &Row<'_>) -> StoreResult<Section> {
    let section_text: String = row.get("section_uuid")?;
    let owner_text: String = row.get("owner_uuid")?;
    let scope_text: String = row.get("scope")?;
    let scope = Scope::parse(&scope_text).ok_or_else(|| {
        OrderStoreError::InvalidData(format!("invalid scope `{scope_text}` in sections.scope"))
    })?;
    let is_default = match row.get::<_, i64>("is_default")? {
        0 => false,
        1 => true,
        other => {
            return Err(OrderStoreError::InvalidData(format!(
                "invalid is_default value `{other}` in sections.is_default"
            )));
        }
    };

    Ok(Section {
        section_id: parse_uuid(&section_text, "sections.section_uuid")?,
        owner_id: parse_uuid(&owner_text, "sections.owner_uuid")?,
        scope,
        display_name: row.get("display_name")?,
        icon: row.get("icon")?,
        is_default,
        sort_order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_item_row(row: &Row<'_>) -> StoreResult<ItemRecord> {
    let item_text: String = row.get("item_uuid")?;
    let owner_text: String = row.get("owner_uuid")?;
    let section_text: String = row.get("section_uuid")?;
    Ok(ItemRecord {
        item_id: parse_uuid(&item_text, "items.item_uuid")?,
        owner_id: parse_uuid(&owner_text, "items.owner_uuid")?,
        section_id: parse_uuid(&section_text, "items.section_uuid")?,
        display_name: row.get("display_name")?,
        detail: row.get("detail")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| OrderStoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(OrderStoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["sections", "classrooms", "memberships"] {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(OrderStoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}
