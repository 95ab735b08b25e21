use classdeck_core::db::migrations::latest_version;
use classdeck_core::db::{open_db, open_db_in_memory, DbError};
use classdeck_core::{OrderStoreError, SqliteOrderStore};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "sections");
    assert_table_exists(&conn, "classrooms");
    assert_table_exists(&conn, "memberships");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classdeck.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "sections");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteOrderStore::try_new(conn).err().unwrap();
    match err {
        OrderStoreError::UninitializedConnection {
            expected_version,
            actual_version,
        } => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn schema_rejects_duplicate_order_and_second_default() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO sections (section_uuid, owner_uuid, scope, display_name, is_default, sort_order)
         VALUES ('s1', 'o1', 'creation', 'A', 1, 1);",
        [],
    )
    .unwrap();

    let duplicate_order = conn.execute(
        "INSERT INTO sections (section_uuid, owner_uuid, scope, display_name, is_default, sort_order)
         VALUES ('s2', 'o1', 'creation', 'B', 0, 1);",
        [],
    );
    assert!(duplicate_order.is_err());

    let second_default = conn.execute(
        "INSERT INTO sections (section_uuid, owner_uuid, scope, display_name, is_default, sort_order)
         VALUES ('s3', 'o1', 'creation', 'C', 1, 2);",
        [],
    );
    assert!(second_default.is_err());

    // Same order is fine in the other scope.
    conn.execute(
        "INSERT INTO sections (section_uuid, owner_uuid, scope, display_name, is_default, sort_order)
         VALUES ('s4', 'o1', 'membership', 'D', 1, 1);",
        [],
    )
    .unwrap();
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
