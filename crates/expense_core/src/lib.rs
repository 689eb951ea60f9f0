//! Local persistence and query layer for the expense tracker.
//! This crate owns the schema, the record invariants and every store access.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;
pub mod store;

pub use config::StoreConfig;
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::expense::{Amount, Expense, ExpenseId, ExpenseValidationError, NewExpense};
pub use repo::expense_repo::{ExpenseRepository, RepoError, RepoResult, SqliteExpenseRepository};
pub use search::range::{search_amount_range, AmountRange};
pub use service::bulk::{clear_all, seed_all, ClearReport, SeedFailure, SeedReport};
pub use service::expense_service::{ExpenseService, ServiceError, ServiceResult};
pub use store::ExpenseStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
