//! Seed and reset utilities for maintenance and demos.
//!
//! # Invariants
//! - Every record is its own request and transaction; a failure never
//!   rolls back records handled before it.
//! - Per-item failures are collected in the report, not raised.

use crate::model::expense::{ExpenseId, NewExpense};
use crate::repo::expense_repo::{RepoError, RepoResult};
use crate::store::ExpenseStore;
use log::{info, warn};

/// One draft that could not be inserted.
#[derive(Debug)]
pub struct SeedFailure {
    /// Position of the draft in the input sequence.
    pub index: usize,
    pub error: RepoError,
}

#[derive(Debug, Default)]
pub struct SeedReport {
    /// New ids, in input order of the drafts that succeeded.
    pub inserted: Vec<ExpenseId>,
    pub failures: Vec<SeedFailure>,
}

impl SeedReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ClearReport {
    pub visited: usize,
    pub deleted: usize,
    pub failures: Vec<(ExpenseId, RepoError)>,
}

/// Inserts every draft with its own request, best effort.
pub async fn seed_all<I>(store: &ExpenseStore, drafts: I) -> SeedReport
where
    I: IntoIterator<Item = NewExpense>,
{
    let mut report = SeedReport::default();
    for (index, draft) in drafts.into_iter().enumerate() {
        match store.insert(draft).await {
            Ok(id) => report.inserted.push(id),
            Err(error) => {
                warn!(
                    "event=bulk_seed module=service status=item_error index={} error={}",
                    index, error
                );
                report.failures.push(SeedFailure { index, error });
            }
        }
    }

    info!(
        "event=bulk_seed module=service status=ok inserted={} failed={}",
        report.inserted.len(),
        report.failures.len()
    );
    report
}

/// Deletes every record visited by a cursor over the title index.
///
/// Individual delete failures are recorded and skipped. Only a failure of
/// the cursor itself aborts the reset.
pub async fn clear_all(store: &ExpenseStore) -> RepoResult<ClearReport> {
    let ids = store.list_ids_by_title().await?;
    let mut report = ClearReport {
        visited: ids.len(),
        ..ClearReport::default()
    };

    for id in ids {
        match store.delete_by_id(id).await {
            Ok(()) => report.deleted += 1,
            Err(error) => {
                warn!(
                    "event=bulk_clear module=service status=item_error id={} error={}",
                    id, error
                );
                report.failures.push((id, error));
            }
        }
    }

    info!(
        "event=bulk_clear module=service status=ok visited={} deleted={} failed={}",
        report.visited,
        report.deleted,
        report.failures.len()
    );
    Ok(report)
}
