//! Connection bootstrap utilities for SQLite.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy)]
enum OpenMode {
    File,
    Memory,
}

impl OpenMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with(OpenMode::File, || Connection::open(path))
}

/// Opens an in-memory SQLite database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(OpenMode::Memory, Connection::open_in_memory)
}

fn open_with(
    mode: OpenMode,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={}", mode.as_str());

    let mut conn = connect().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
            mode.as_str(),
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    if let Err(err) = bootstrap_connection(&mut conn) {
        error!(
            "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
            mode.as_str(),
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={} duration_ms={}",
        mode.as_str(),
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}
