//! Referential integrity validator.
//!
//! # Responsibility
//! - Walk a collection and check every declared reference resolves.
//! - Collect offending record ids without blocking other work.
//!
//! # Invariants
//! - Checks are driven by `graph::REFERENCE_GRAPH` only.
//! - An offending record is reported once, whichever checks failed.
//! - Output order follows store order.
//!
//! # See also
//! - `service::mutator` for the cascade that keeps these invariants.

use crate::graph::{self, GraphError};
use crate::model::collection::Collection;
use crate::model::document::Document;
use crate::model::object_id::ObjectId;
use crate::repo::record_store::{RecordStore, StoreError, StoreResult};
use crate::service::progress::ProgressSink;
use log::{debug, info, warn};
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors that stop a validation run.
#[derive(Debug)]
pub enum ValidateError {
    Store(StoreError),
    Cancelled {
        collection: Collection,
        processed: usize,
        total: usize,
    },
}

impl Display for ValidateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Cancelled {
                collection,
                processed,
                total,
            } => write!(
                f,
                "validation of {collection} cancelled after {processed} of {total} records"
            ),
        }
    }
}

impl Error for ValidateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Cancelled { .. } => None,
        }
    }
}

impl From<StoreError> for ValidateError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Reference problems found on one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordIssues {
    /// Child ids that do not resolve.
    pub broken_children: Vec<ObjectId>,
    /// Parent id that does not resolve.
    pub broken_parent: Option<ObjectId>,
    /// Reference fields that could not be read.
    pub malformed_fields: Vec<&'static str>,
}

impl RecordIssues {
    pub fn is_offending(&self) -> bool {
        !self.broken_children.is_empty()
            || self.broken_parent.is_some()
            || !self.malformed_fields.is_empty()
    }
}

/// Offending ids of all three collections, kept as three separate lists.
///
/// Serializes as `[answers, questions, quizzes]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub answers: Vec<ObjectId>,
    pub questions: Vec<ObjectId>,
    pub quizzes: Vec<ObjectId>,
}

impl ValidationReport {
    pub fn for_collection(&self, collection: Collection) -> &[ObjectId] {
        match collection {
            Collection::Answers => &self.answers,
            Collection::Questions => &self.questions,
            Collection::Quizzes => &self.quizzes,
        }
    }

    /// Lists in report order: answers, questions, quizzes.
    pub fn lists(&self) -> [&[ObjectId]; 3] {
        [&self.answers, &self.questions, &self.quizzes]
    }

    pub fn total_offending(&self) -> usize {
        self.answers.len() + self.questions.len() + self.quizzes.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total_offending() == 0
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(3))?;
        for list in self.lists() {
            seq.serialize_element(list)?;
        }
        seq.end()
    }
}

/// Full-scan integrity validator over an injected record store.
pub struct IntegrityValidator<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> IntegrityValidator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns ids of offending records in `collection`.
    pub fn validate(
        &self,
        collection: Collection,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<ObjectId>, ValidateError> {
        let started_at = Instant::now();
        let label = format!("Validating {}", collection.label());
        let records = self.store.all(collection)?;
        let total = records.len();
        info!("event=validate module=validator status=start collection={collection} total={total}");
        progress.begin(&label, total);

        let mut offending = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if progress.should_stop() {
                warn!(
                    "event=validate module=validator status=cancelled collection={collection} processed={index} total={total}"
                );
                return Err(ValidateError::Cancelled {
                    collection,
                    processed: index,
                    total,
                });
            }

            let issues = self.inspect(collection, record)?;
            if issues.is_offending() {
                debug!(
                    "event=validate_record module=validator status=offending collection={} id={} broken_children={} broken_parent={} malformed={:?}",
                    collection,
                    record.id,
                    issues.broken_children.len(),
                    issues.broken_parent.is_some(),
                    issues.malformed_fields
                );
                offending.push(record.id);
            }
            progress.advance(index + 1, total);
        }

        progress.finish(&label, total);
        info!(
            "event=validate module=validator status=ok collection={} total={} offending={} duration_ms={}",
            collection,
            total,
            offending.len(),
            started_at.elapsed().as_millis()
        );
        Ok(offending)
    }

    pub fn validate_answers(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<ObjectId>, ValidateError> {
        self.validate(Collection::Answers, progress)
    }

    pub fn validate_questions(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<ObjectId>, ValidateError> {
        self.validate(Collection::Questions, progress)
    }

    pub fn validate_quizzes(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<ObjectId>, ValidateError> {
        self.validate(Collection::Quizzes, progress)
    }

    /// Validates answers, questions and quizzes, in that order.
    pub fn validate_all(
        &self,
        progress: &mut dyn ProgressSink,
    ) -> Result<ValidationReport, ValidateError> {
        Ok(ValidationReport {
            answers: self.validate_answers(progress)?,
            questions: self.validate_questions(progress)?,
            quizzes: self.validate_quizzes(progress)?,
        })
    }

    /// Checks one record against its collection's declared references.
    pub fn inspect(&self, collection: Collection, record: &Document) -> StoreResult<RecordIssues> {
        let links = graph::links(collection);
        let mut issues = RecordIssues::default();

        if let Some(child) = links.child.filter(|child| child.applies_to(record)) {
            match child.child_ids(collection, record) {
                Ok(ids) => {
                    for id in ids {
                        if !self.store.exists(child.collection, id)? {
                            issues.broken_children.push(id);
                        }
                    }
                }
                Err(err) => record_malformed(&mut issues, err),
            }
        }

        if let Some(parent) = links.parent {
            match parent.parent_id(collection, record) {
                Ok(id) => {
                    if !self.store.exists(parent.collection, id)? {
                        issues.broken_parent = Some(id);
                    }
                }
                Err(err) => record_malformed(&mut issues, err),
            }
        }

        Ok(issues)
    }
}

fn record_malformed(issues: &mut RecordIssues, err: GraphError) {
    warn!("event=validate_record module=validator status=malformed error={err}");
    let GraphError::MalformedReference { field, .. } = err;
    issues.malformed_fields.push(field);
}
