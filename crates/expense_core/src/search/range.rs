//! Amount range cursor over the `amount_cents` secondary index.
//!
//! # Responsibility
//! - Walk expenses whose amount lies in an inclusive `[low, high]` interval.
//! - Hand each matched row to a caller-supplied visitor, one step at a time.
//!
//! # Invariants
//! - Rows are yielded in ascending amount order via the amount index.
//! - Ties on equal amounts follow index order; callers must not rely on it.
//! - `low > high` is an empty interval, never an error.
//! - The scan runs inside one read transaction.

use crate::db::migrations::AMOUNT_INDEX;
use crate::model::expense::{Amount, Expense};
use crate::repo::expense_repo::{parse_expense_row, RepoError, RepoResult};
use log::debug;
use rusqlite::{params, Connection};
use std::time::Instant;

/// Inclusive amount interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountRange {
    pub low: Amount,
    pub high: Amount,
}

impl AmountRange {
    pub fn new(low: Amount, high: Amount) -> Self {
        Self { low, high }
    }

    /// Interval covering every representable amount.
    pub fn all() -> Self {
        Self::new(Amount::MIN, Amount::MAX)
    }

    /// Parses both bounds from form text.
    pub fn parse(
        low: &str,
        high: &str,
    ) -> Result<Self, crate::model::expense::ExpenseValidationError> {
        Ok(Self::new(Amount::parse(low)?, Amount::parse(high)?))
    }

    pub fn is_empty(&self) -> bool {
        self.low > self.high
    }

    pub fn contains(&self, amount: Amount) -> bool {
        self.low <= amount && amount <= self.high
    }
}

/// Visits every expense in `range`, returning the match count.
///
/// `on_each` runs synchronously before the cursor advances. A cursor
/// failure mid-scan is reported as `RepoError::Iteration`; rows already
/// handed to `on_each` stay delivered.
pub fn scan_amount_range(
    conn: &Connection,
    range: AmountRange,
    on_each: &mut dyn FnMut(&Expense),
) -> RepoResult<usize> {
    if range.is_empty() {
        return Ok(0);
    }

    let started_at = Instant::now();
    let tx = conn.unchecked_transaction()?;
    let matched = {
        let mut stmt = tx.prepare(&format!(
            "SELECT id, title, amount_cents
             FROM expenses INDEXED BY {AMOUNT_INDEX}
             WHERE amount_cents BETWEEN ?1 AND ?2
             ORDER BY amount_cents ASC;"
        ))?;
        let mut rows = stmt
            .query(params![range.low.cents(), range.high.cents()])
            .map_err(RepoError::Iteration)?;

        let mut matched = 0usize;
        while let Some(row) = rows.next().map_err(RepoError::Iteration)? {
            let expense = parse_expense_row(row)?;
            on_each(&expense);
            matched += 1;
        }
        matched
    };
    tx.finish()?;

    debug!(
        "event=amount_range_scan module=search status=ok matched={} duration_ms={}",
        matched,
        started_at.elapsed().as_millis()
    );
    Ok(matched)
}

/// Collects every expense in `range` in index order.
pub fn search_amount_range(conn: &Connection, range: AmountRange) -> RepoResult<Vec<Expense>> {
    let mut found = Vec::new();
    scan_amount_range(conn, range, &mut |expense: &Expense| found.push(expense.clone()))?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::AmountRange;
    use crate::model::expense::Amount;

    #[test]
    fn inverted_range_is_empty() {
        let range = AmountRange::new(Amount::from_units(50), Amount::from_units(40));
        assert!(range.is_empty());
        assert!(!range.contains(Amount::from_units(45)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = AmountRange::parse("40", "50").unwrap();
        assert!(range.contains(Amount::from_units(40)));
        assert!(range.contains(Amount::from_units(50)));
        assert!(!range.contains(Amount::from_cents(5001)));
        assert!(AmountRange::all().contains(Amount::MIN));
    }
}
