//! Asynchronous handle over the expense store.
//!
//! # Responsibility
//! - Open the store once and hand back a handle only after the schema is
//!   current.
//! - Turn every repository call into a request that completes later, so
//!   callers never block on SQLite.
//!
//! # Invariants
//! - One worker thread owns the connection; requests run one at a time in
//!   submission order, each in its own transaction.
//! - A request issued after the worker stopped fails with
//!   `RepoError::StoreClosed`.
//! - A panicking range visitor fails only its own request with
//!   `RepoError::VisitorPanicked`; the worker keeps running.
//! - There is no cancellation: dropping a pending future does not stop the
//!   request it issued.

mod worker;

use crate::config::StoreConfig;
use crate::db::{DbError, DbResult};
use crate::model::expense::{Expense, ExpenseId, NewExpense};
use crate::repo::expense_repo::{RepoError, RepoResult};
use crate::search::range::AmountRange;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use worker::{Command, Reply, RowVisitor};

/// Cloneable handle to an open expense store.
///
/// The worker stops, and the connection closes, once every clone is dropped.
#[derive(Clone)]
pub struct ExpenseStore {
    commands: mpsc::UnboundedSender<Command>,
    name: Arc<str>,
}

impl ExpenseStore {
    /// Opens the store, running any pending upgrade first.
    ///
    /// # Errors
    /// - `DbError::Blocked` when another connection prevents the upgrade.
    /// - Schema errors (`Migration`, `UnsupportedSchemaVersion`,
    ///   `SchemaIncomplete`) when the upgrade cannot complete.
    pub async fn open(config: &StoreConfig) -> DbResult<Self> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        worker::spawn(config.clone(), receiver, ready_tx)?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                commands,
                name: Arc::from(config.name.as_str()),
            }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DbError::Io(std::io::Error::other(
                "store worker exited before reporting readiness",
            ))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a record; the store assigns and returns its id.
    pub async fn insert(&self, draft: NewExpense) -> RepoResult<ExpenseId> {
        self.request(|reply| Command::Insert { draft, reply }).await
    }

    pub async fn get_by_id(&self, id: ExpenseId) -> RepoResult<Option<Expense>> {
        self.request(|reply| Command::Get { id, reply }).await
    }

    /// Rewrites title and amount of an existing record.
    ///
    /// Fails with `RepoError::NotFound` instead of creating a record.
    pub async fn update(&self, id: ExpenseId, changes: NewExpense) -> RepoResult<()> {
        let expense = Expense {
            id,
            title: changes.title,
            amount: changes.amount,
        };
        self.request(|reply| Command::Update { expense, reply }).await
    }

    /// Removes a record; succeeds when the id is already absent.
    pub async fn delete_by_id(&self, id: ExpenseId) -> RepoResult<()> {
        self.request(|reply| Command::Delete { id, reply }).await
    }

    /// Walks `[range.low, range.high]` on the amount index.
    ///
    /// `on_each` runs on the worker thread, once per match, before the
    /// cursor advances. The returned count is `0` for an empty range; errors
    /// come back as `Err`, never as a zero count.
    pub async fn range_by_amount<F>(&self, range: AmountRange, on_each: F) -> RepoResult<usize>
    where
        F: FnMut(&Expense) + Send + 'static,
    {
        let on_each: RowVisitor = Box::new(on_each);
        self.request(|reply| Command::ScanAmount {
            range,
            on_each,
            reply,
        })
        .await
    }

    /// Collects the records in `range` in amount-index order.
    pub async fn search(&self, range: AmountRange) -> RepoResult<Vec<Expense>> {
        self.request(|reply| Command::SearchAmount { range, reply }).await
    }

    /// Primary keys of every record, in title-index order.
    pub async fn list_ids_by_title(&self) -> RepoResult<Vec<ExpenseId>> {
        self.request(|reply| Command::ListIdsByTitle { reply }).await
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> RepoResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| RepoError::StoreClosed)?;
        response.await.map_err(|_| RepoError::StoreClosed)?
    }
}

impl std::fmt::Debug for ExpenseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpenseStore")
            .field("name", &self.name)
            .field("open", &!self.commands.is_closed())
            .finish()
    }
}
