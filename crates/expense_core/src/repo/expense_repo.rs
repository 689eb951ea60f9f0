//! Expense repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the canonical `expenses` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Every operation runs in its own transaction; a failed write leaves
//!   the table untouched.
//! - Write paths validate and trim titles before SQL mutations.
//! - `update_expense` never creates a row; a missing id is `NotFound`.
//! - `delete_expense` is idempotent.

use crate::db::migrations::{current_version, find_missing_object, latest_version, TITLE_INDEX};
use crate::db::DbError;
use crate::model::expense::{Amount, Expense, ExpenseId, ExpenseValidationError, NewExpense};
use crate::search::range::{scan_amount_range, AmountRange};
use log::{debug, warn};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for expense persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ExpenseValidationError),
    Db(DbError),
    NotFound(ExpenseId),
    /// The store rejected an insert, update or delete.
    Write(rusqlite::Error),
    /// The cursor failed mid-scan.
    Iteration(rusqlite::Error),
    /// A range visitor panicked; the scan stopped at that row.
    VisitorPanicked(String),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredIndex(&'static str),
    /// The worker owning the connection is gone.
    StoreClosed,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "expense not found: {id}"),
            Self::Write(err) => write!(f, "write rejected by store: {err}"),
            Self::Iteration(err) => write!(f, "cursor failed during scan: {err}"),
            Self::VisitorPanicked(message) => write!(f, "range visitor panicked: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted expense data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredIndex(index) => write!(f, "required index `{index}` is missing"),
            Self::StoreClosed => write!(f, "expense store is closed"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Write(err) | Self::Iteration(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ExpenseValidationError> for RepoError {
    fn from(value: ExpenseValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for expense CRUD and indexed reads.
pub trait ExpenseRepository {
    fn create_expense(&self, draft: &NewExpense) -> RepoResult<ExpenseId>;
    fn get_expense(&self, id: ExpenseId) -> RepoResult<Option<Expense>>;
    fn update_expense(&self, expense: &Expense) -> RepoResult<()>;
    fn delete_expense(&self, id: ExpenseId) -> RepoResult<()>;
    fn scan_amount_range(
        &self,
        range: AmountRange,
        on_each: &mut dyn FnMut(&Expense),
    ) -> RepoResult<usize>;
    /// Primary keys in title-index order.
    fn list_ids_by_title(&self) -> RepoResult<Vec<ExpenseId>>;
}

/// SQLite-backed expense repository.
pub struct SqliteExpenseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteExpenseRepository<'conn> {
    /// Wraps a connection after checking it carries the full schema.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let actual_version = current_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        match find_missing_object(conn)? {
            Some(("table", name)) => return Err(RepoError::MissingRequiredTable(name)),
            Some((_, name)) => return Err(RepoError::MissingRequiredIndex(name)),
            None => {}
        }
        Ok(Self { conn })
    }

    /// Wraps a connection that `open_with_config` already migrated and
    /// verified.
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ExpenseRepository for SqliteExpenseRepository<'_> {
    fn create_expense(&self, draft: &NewExpense) -> RepoResult<ExpenseId> {
        let draft = draft.normalized()?;

        let tx = self.conn.unchecked_transaction().map_err(RepoError::Write)?;
        tx.execute(
            "INSERT INTO expenses (title, amount_cents) VALUES (?1, ?2);",
            params![draft.title.as_str(), draft.amount.cents()],
        )
        .map_err(RepoError::Write)?;
        let id = tx.last_insert_rowid();
        tx.commit().map_err(RepoError::Write)?;

        debug!("event=expense_insert module=repo status=ok id={id}");
        Ok(id)
    }

    fn get_expense(&self, id: ExpenseId) -> RepoResult<Option<Expense>> {
        let tx = self.conn.unchecked_transaction()?;
        let found = select_by_id(&tx, id)?;
        tx.finish()?;
        Ok(found)
    }

    fn update_expense(&self, expense: &Expense) -> RepoResult<()> {
        let expense = expense.normalized()?;

        let tx = self.conn.unchecked_transaction().map_err(RepoError::Write)?;
        let Some(existing) = select_by_id(&tx, expense.id)? else {
            warn!(
                "event=expense_update module=repo status=not_found id={}",
                expense.id
            );
            return Err(RepoError::NotFound(expense.id));
        };

        let merged = existing.with_changes(NewExpense {
            title: expense.title.clone(),
            amount: expense.amount,
        });
        tx.execute(
            "INSERT INTO expenses (id, title, amount_cents) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                amount_cents = excluded.amount_cents;",
            params![merged.id, merged.title.as_str(), merged.amount.cents()],
        )
        .map_err(RepoError::Write)?;
        tx.commit().map_err(RepoError::Write)?;

        debug!("event=expense_update module=repo status=ok id={}", expense.id);
        Ok(())
    }

    fn delete_expense(&self, id: ExpenseId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction().map_err(RepoError::Write)?;
        let removed = tx
            .execute("DELETE FROM expenses WHERE id = ?1;", [id])
            .map_err(RepoError::Write)?;
        tx.commit().map_err(RepoError::Write)?;

        debug!("event=expense_delete module=repo status=ok id={id} removed={removed}");
        Ok(())
    }

    fn scan_amount_range(
        &self,
        range: AmountRange,
        on_each: &mut dyn FnMut(&Expense),
    ) -> RepoResult<usize> {
        scan_amount_range(self.conn, range, on_each)
    }

    fn list_ids_by_title(&self) -> RepoResult<Vec<ExpenseId>> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id FROM expenses INDEXED BY {TITLE_INDEX}
                 WHERE title IS NOT NULL
                 ORDER BY title ASC;"
            ))?;
            let mut rows = stmt.query([]).map_err(RepoError::Iteration)?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next().map_err(RepoError::Iteration)? {
                ids.push(row.get::<_, ExpenseId>(0)?);
            }
            ids
        };
        tx.finish()?;
        Ok(ids)
    }
}

fn select_by_id(conn: &Connection, id: ExpenseId) -> RepoResult<Option<Expense>> {
    let mut stmt = conn.prepare("SELECT id, title, amount_cents FROM expenses WHERE id = ?1;")?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_expense_row(row)?)),
        None => Ok(None),
    }
}

/// Decodes one `expenses` row, rejecting invalid persisted state.
pub(crate) fn parse_expense_row(row: &Row<'_>) -> RepoResult<Expense> {
    let expense = Expense {
        id: row.get("id")?,
        title: row.get("title")?,
        amount: Amount::from_cents(row.get("amount_cents")?),
    };
    expense.validate().map_err(|err| {
        RepoError::InvalidData(format!("expenses.id={} {err}", expense.id))
    })?;
    Ok(expense)
}
