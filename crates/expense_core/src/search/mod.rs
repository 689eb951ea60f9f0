//! Index-backed query paths.
//!
//! # Responsibility
//! - Expose range queries over the amount index.
//! - Keep cursor handling and row shaping inside core.

pub mod range;
