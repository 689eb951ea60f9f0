//! SQLite migration registry and executor.
//!
//! # Responsibility
//! - Register schema steps in strictly increasing version order.
//! - Bring a store from its on-disk version up to `latest_version()`.
//!
//! # Invariants
//! - `version` values must remain monotonic.
//! - Every step is idempotent (`IF NOT EXISTS`), so a replay is a no-op.
//! - The pending range runs inside one immediate transaction; a failed step
//!   leaves the store at its previous version.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};

/// Table holding expense rows.
pub const EXPENSES_TABLE: &str = "expenses";
/// Non-unique index over `title`.
pub const TITLE_INDEX: &str = "idx_expenses_title";
/// Non-unique index over `amount_cents`, used by range search.
pub const AMOUNT_INDEX: &str = "idx_expenses_amount";

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "expenses_table",
        sql: include_str!("0001_expenses.sql"),
    },
    Migration {
        version: 2,
        name: "title_index",
        sql: include_str!("0002_title_index.sql"),
    },
    Migration {
        version: 3,
        name: "amount_index",
        sql: include_str!("0003_amount_index.sql"),
    },
];

/// Schema objects every migrated store must carry, as `(type, name)`.
const REQUIRED_OBJECTS: &[(&str, &str)] = &[
    ("table", EXPENSES_TABLE),
    ("index", TITLE_INDEX),
    ("index", AMOUNT_INDEX),
];

/// Returns the schema version this binary expects.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads the store's current schema version.
pub fn current_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Applies all pending migrations on the provided connection.
///
/// Returns the number of steps applied; `0` means the store was current.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let latest = latest_version();
    let observed = current_version(conn)?;
    check_supported(observed, latest)?;
    if observed == latest {
        return Ok(0);
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Another process may have upgraded while we waited for the write lock.
    let from_version = current_version(&tx)?;
    check_supported(from_version, latest)?;

    let mut applied = 0;
    for migration in MIGRATIONS {
        if migration.version <= from_version {
            continue;
        }

        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| {
                warn!(
                    "event=db_migrate module=db status=error version={} name={}",
                    migration.version, migration.name
                );
                DbError::Migration {
                    version: migration.version,
                    source,
                }
            })?;
        applied += 1;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
        from_version, latest, applied
    );
    Ok(applied)
}

/// Returns the first required table or index absent from the store.
pub fn find_missing_object(conn: &Connection) -> DbResult<Option<(&'static str, &'static str)>> {
    for &(kind, name) in REQUIRED_OBJECTS {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
            [kind, name],
            |row| row.get(0),
        )?;
        if !exists {
            return Ok(Some((kind, name)));
        }
    }
    Ok(None)
}

/// Fails with `SchemaIncomplete` when a required object is missing even
/// though the version says the store is current.
pub fn verify_schema(conn: &Connection) -> DbResult<()> {
    match find_missing_object(conn)? {
        Some((_, name)) => Err(DbError::SchemaIncomplete { missing: name }),
        None => Ok(()),
    }
}

fn check_supported(db_version: u32, latest: u32) -> DbResult<()> {
    if db_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported: latest,
        });
    }
    Ok(())
}
