//! Domain model for the expense store.
//!
//! # Responsibility
//! - Define the record persisted by the store and its draft form.
//! - Parse and validate user-entered values at the boundary.
//!
//! # Invariants
//! - Amounts use one representation (signed cents) on every path.

pub mod expense;
