//! Domain model for the quiz dataset.
//!
//! # Responsibility
//! - Define identifiers, collection names and record shapes.
//! - Keep raw (`Document`) and typed (`Quiz`/`Question`/`Answer`) views apart.
//!
//! # Invariants
//! - Every record is identified by a stable `ObjectId` under `_id`.
//! - Ownership is strictly hierarchical: quiz -> questions -> answers.

pub mod collection;
pub mod document;
pub mod object_id;
pub mod quiz;
