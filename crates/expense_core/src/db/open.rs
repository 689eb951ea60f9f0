//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure the busy timeout used while other connections hold locks.
//! - Run the schema upgrade before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have every migration applied.
//! - Lock contention during bootstrap surfaces as `DbError::Blocked`.

use super::migrations::{apply_migrations, verify_schema};
use super::{is_busy, DbError, DbResult};
use crate::config::StoreConfig;
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;

/// Opens a SQLite database file with default settings and applies all
/// pending migrations.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with_config(&StoreConfig::file(path.as_ref()))
}

/// Opens a private in-memory database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with_config(&StoreConfig::in_memory())
}

/// Opens the store described by `config`.
///
/// # Side effects
/// - Creates the parent directory of a file-backed store if missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_with_config(config: &StoreConfig) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = config.mode();
    info!(
        "event=db_open module=db status=start mode={} store={}",
        mode, config.name
    );

    let mut conn = match connect(config) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err);
        }
    };

    match bootstrap_connection(&mut conn, config) {
        Ok(applied) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={} migrations_applied={}",
                mode,
                started_at.elapsed().as_millis(),
                applied
            );
            Ok(conn)
        }
        Err(err @ DbError::Blocked { .. }) => {
            warn!(
                "event=db_open module=db status=blocked mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Err(err)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn connect(config: &StoreConfig) -> DbResult<Connection> {
    match &config.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Connection::open(path)?)
        }
        None => Ok(Connection::open_in_memory()?),
    }
}

fn bootstrap_connection(conn: &mut Connection, config: &StoreConfig) -> DbResult<usize> {
    conn.busy_timeout(config.busy_timeout())?;
    let applied = apply_migrations(conn).map_err(|err| classify_lock_error(err, config))?;
    verify_schema(conn)?;
    Ok(applied)
}

fn classify_lock_error(err: DbError, config: &StoreConfig) -> DbError {
    let busy = match &err {
        DbError::Sqlite(inner) | DbError::Migration { source: inner, .. } => is_busy(inner),
        _ => false,
    };
    if busy {
        DbError::Blocked {
            waited_ms: config.busy_timeout_ms,
        }
    } else {
        err
    }
}
