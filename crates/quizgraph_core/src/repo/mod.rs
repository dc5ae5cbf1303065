//! Repository layer: the record store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define attribute-level data access over the three collections.
//! - Isolate SQLite and JSON-path details from maintenance and query services.
//!
//! # Invariants
//! - Repository APIs distinguish "no such record" (`Ok(None)`/`Ok(false)`)
//!   from transport errors.
//! - The repository never follows references between collections.

pub mod record_store;
