//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from the async store and services.
//!
//! # Invariants
//! - Repository writes validate drafts before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `Write`,
//!   `Iteration`) in addition to DB transport errors.

pub mod expense_repo;
