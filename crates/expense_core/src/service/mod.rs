//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate async store calls into use-case level APIs.
//! - Keep UI layers decoupled from storage details.

pub mod bulk;
pub mod expense_service;
