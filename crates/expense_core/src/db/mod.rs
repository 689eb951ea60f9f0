//! SQLite storage bootstrap and schema migration entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the expense store.
//! - Apply schema migrations in deterministic order.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No expense data is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_with_config};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// Another connection held a lock past the busy timeout.
    Blocked {
        waited_ms: u64,
    },
    /// A migration step failed; the whole upgrade was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The version is current but a required table or index is absent.
    SchemaIncomplete {
        missing: &'static str,
    },
    Io(std::io::Error),
}

impl DbError {
    /// Whether this error means the store could not be reached at all.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Blocked { .. } | Self::Io(_) | Self::Sqlite(_))
    }

    /// Whether this error came from the upgrade step.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::Migration { .. }
                | Self::UnsupportedSchemaVersion { .. }
                | Self::SchemaIncomplete { .. }
        )
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Blocked { waited_ms } => write!(
                f,
                "database is locked by another connection (waited {waited_ms} ms); close other connections and retry"
            ),
            Self::Migration { version, source } => {
                write!(f, "schema migration to version {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaIncomplete { missing } => {
                write!(f, "schema is marked current but `{missing}` is missing")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Migration { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            Self::Blocked { .. }
            | Self::UnsupportedSchemaVersion { .. }
            | Self::SchemaIncomplete { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Returns true for SQLite busy/locked failures.
pub(crate) fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if matches!(
                inner.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}
