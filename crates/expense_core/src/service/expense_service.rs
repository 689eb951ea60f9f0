//! Expense use-case service for the form/table front end.
//!
//! # Responsibility
//! - Expose the five operations a UI needs: search, create, load for
//!   edit, update, delete.
//! - Parse raw form text once, at this boundary.
//!
//! # Invariants
//! - An empty search result is `Ok(vec![])`, never an error.
//! - A missing record is always `ServiceError::RecordNotFound`.
//! - Refreshing views after writes is the caller's job.

use crate::model::expense::{Amount, Expense, ExpenseId, ExpenseValidationError, NewExpense};
use crate::repo::expense_repo::RepoError;
use crate::search::range::AmountRange;
use crate::store::ExpenseStore;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error surfaced to UI callers.
#[derive(Debug)]
pub enum ServiceError {
    /// Form input failed validation; nothing was written.
    Invalid(ExpenseValidationError),
    RecordNotFound(ExpenseId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(err) => write!(f, "{err}"),
            Self::RecordNotFound(id) => write!(f, "expense {id} does not exist"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Invalid(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::RecordNotFound(_) => None,
        }
    }
}

impl From<ExpenseValidationError> for ServiceError {
    fn from(value: ExpenseValidationError) -> Self {
        Self::Invalid(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::RecordNotFound(id),
            RepoError::Validation(err) => Self::Invalid(err),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service wrapping an open store.
#[derive(Debug, Clone)]
pub struct ExpenseService {
    store: ExpenseStore,
}

impl ExpenseService {
    pub fn new(store: ExpenseStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ExpenseStore {
        &self.store
    }

    /// Records with `low <= amount <= high`, in amount order.
    pub async fn search(&self, low: Amount, high: Amount) -> ServiceResult<Vec<Expense>> {
        Ok(self.store.search(AmountRange::new(low, high)).await?)
    }

    /// Same as [`Self::search`], with bounds taken from form text.
    pub async fn search_text(&self, low: &str, high: &str) -> ServiceResult<Vec<Expense>> {
        let range = AmountRange::parse(low, high)?;
        Ok(self.store.search(range).await?)
    }

    /// Creates a record from form text and returns its new id.
    pub async fn create_record(&self, title: &str, amount: &str) -> ServiceResult<ExpenseId> {
        let draft = NewExpense::parse(title, amount)?;
        Ok(self.store.insert(draft).await?)
    }

    /// Fetches a record to prefill an edit form.
    pub async fn load_record_for_edit(&self, id: ExpenseId) -> ServiceResult<Expense> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(ServiceError::RecordNotFound(id))
    }

    pub async fn update_record(&self, id: ExpenseId, title: &str, amount: &str) -> ServiceResult<()> {
        let changes = NewExpense::parse(title, amount)?;
        Ok(self.store.update(id, changes).await?)
    }

    /// Deletes a record; deleting an absent id succeeds.
    pub async fn delete_record(&self, id: ExpenseId) -> ServiceResult<()> {
        Ok(self.store.delete_by_id(id).await?)
    }
}
