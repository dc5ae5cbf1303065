//! Maintenance and query services over the record store.
//!
//! # Responsibility
//! - Validate referential integrity (`validator`).
//! - Cascade deletions and de-duplication (`mutator`).
//! - Compose read-side expansions for the API (`query`).
//!
//! # Invariants
//! - Every service receives its store at construction; none opens its own.
//! - Validator and mutator read reference shapes from `graph` only.

pub mod mutator;
pub mod progress;
pub mod query;
pub mod validator;
