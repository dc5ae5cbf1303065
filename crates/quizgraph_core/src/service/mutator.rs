//! Cascading deletion and de-duplication.
//!
//! # Responsibility
//! - Delete a record together with everything it owns.
//! - Remove records sharing an attribute value through the same cascade.
//! - Wipe whole collections for a full dataset reset.
//!
//! # Invariants
//! - A parent is deleted only after every owned child was removed.
//! - The first failing child aborts the cascade; the parent stays in place.
//! - Removing an id that is already gone is a no-op, not an error.
//! - Descent follows `graph::REFERENCE_GRAPH` child links only.

use crate::graph::{self, GraphError};
use crate::model::collection::Collection;
use crate::model::object_id::ObjectId;
use crate::repo::record_store::{RecordStore, StoreError, StoreResult};
use crate::service::progress::ProgressSink;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type MutationResult<T> = Result<T, MutationError>;

/// Errors from cascading mutations.
#[derive(Debug)]
pub enum MutationError {
    /// Store failure on the record itself.
    Store(StoreError),
    /// Owned-children field cannot be read, so the record was left in place.
    Graph(GraphError),
    /// A child removal failed; the remaining cascade was aborted and the
    /// parent record was not deleted.
    PartialCascade {
        collection: Collection,
        id: ObjectId,
        child: ObjectId,
        source: Box<MutationError>,
    },
    /// Batch stopped by its progress sink.
    Cancelled { processed: usize, total: usize },
}

impl Display for MutationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Graph(err) => write!(f, "{err}"),
            Self::PartialCascade {
                collection,
                id,
                child,
                source,
            } => write!(
                f,
                "cascade delete of {collection} record {id} aborted at child {child}: {source}"
            ),
            Self::Cancelled { processed, total } => {
                write!(f, "batch cancelled after {processed} of {total} items")
            }
        }
    }
}

impl Error for MutationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Graph(err) => Some(err),
            Self::PartialCascade { source, .. } => Some(source.as_ref()),
            Self::Cancelled { .. } => None,
        }
    }
}

impl From<StoreError> for MutationError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<GraphError> for MutationError {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}

/// What to keep when removing records that share a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Remove every record carrying the value.
    #[default]
    RemoveAllMatching,
    /// Keep the first record in store order, remove the rest.
    RemoveAllButOne,
}

/// Number of records deleted per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub quizzes: usize,
    pub questions: usize,
    pub answers: usize,
}

impl CascadeReport {
    pub fn removed(&self, collection: Collection) -> usize {
        match collection {
            Collection::Quizzes => self.quizzes,
            Collection::Questions => self.questions,
            Collection::Answers => self.answers,
        }
    }

    pub fn total(&self) -> usize {
        self.quizzes + self.questions + self.answers
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn record(&mut self, collection: Collection) {
        match collection {
            Collection::Quizzes => self.quizzes += 1,
            Collection::Questions => self.questions += 1,
            Collection::Answers => self.answers += 1,
        }
    }

    fn merge(&mut self, other: CascadeReport) {
        self.quizzes += other.quizzes;
        self.questions += other.questions;
        self.answers += other.answers;
    }
}

/// Cascading remover over an injected record store.
pub struct CascadingMutator<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> CascadingMutator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Removes one record and, transitively, everything it owns.
    pub fn remove(&self, collection: Collection, id: ObjectId) -> MutationResult<CascadeReport> {
        let Some(record) = self.store.get(collection, id)? else {
            debug!("event=cascade_remove module=mutator status=skipped collection={collection} id={id} reason=not_found");
            return Ok(CascadeReport::default());
        };

        let mut report = CascadeReport::default();
        if let Some(child) = graph::links(collection).child {
            for child_id in child.child_ids(collection, &record)? {
                match self.remove(child.collection, child_id) {
                    Ok(child_report) => report.merge(child_report),
                    Err(err) => {
                        error!(
                            "event=cascade_remove module=mutator status=error collection={collection} id={id} child={child_id} error={err}"
                        );
                        return Err(MutationError::PartialCascade {
                            collection,
                            id,
                            child: child_id,
                            source: Box::new(err),
                        });
                    }
                }
            }
        }

        if self.store.delete(collection, id)? {
            report.record(collection);
        }
        Ok(report)
    }

    pub fn remove_answer(&self, id: ObjectId) -> MutationResult<CascadeReport> {
        self.remove(Collection::Answers, id)
    }

    pub fn remove_question(&self, id: ObjectId) -> MutationResult<CascadeReport> {
        self.remove(Collection::Questions, id)
    }

    pub fn remove_quiz(&self, id: ObjectId) -> MutationResult<CascadeReport> {
        self.remove(Collection::Quizzes, id)
    }

    /// Removes quizzes one after another, reporting progress per quiz.
    pub fn remove_quizzes(
        &self,
        ids: &[ObjectId],
        progress: &mut dyn ProgressSink,
    ) -> MutationResult<CascadeReport> {
        let label = "Removing Quizzes";
        let total = ids.len();
        let started_at = Instant::now();
        progress.begin(label, total);

        let mut report = CascadeReport::default();
        for (index, id) in ids.iter().enumerate() {
            stop_if_requested(progress, index, total)?;
            report.merge(self.remove_quiz(*id)?);
            progress.advance(index + 1, total);
        }

        progress.finish(label, total);
        info!(
            "event=remove_quizzes module=mutator status=ok requested={} removed_quizzes={} removed_questions={} removed_answers={} duration_ms={}",
            total,
            report.quizzes,
            report.questions,
            report.answers,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Deletes every record of one collection without cascading.
    ///
    /// Only consistent when run for all three collections in
    /// `Collection::RESET_ORDER`; see [`Self::remove_all`].
    pub fn empty_collection(
        &self,
        collection: Collection,
        progress: &mut dyn ProgressSink,
    ) -> MutationResult<usize> {
        let label = format!("Removing {}", collection.label());
        let records = self.store.all(collection)?;
        let total = records.len();
        progress.begin(&label, total);

        let mut removed = 0;
        for (index, record) in records.iter().enumerate() {
            stop_if_requested(progress, index, total)?;
            if self.store.delete(collection, record.id)? {
                removed += 1;
            }
            progress.advance(index + 1, total);
        }

        progress.finish(&label, total);
        warn!("event=empty_collection module=mutator status=ok collection={collection} removed={removed}");
        Ok(removed)
    }

    /// Wipes the whole dataset: answers, then questions, then quizzes.
    pub fn remove_all(&self, progress: &mut dyn ProgressSink) -> MutationResult<CascadeReport> {
        let mut report = CascadeReport::default();
        for collection in Collection::RESET_ORDER {
            let removed = self.empty_collection(collection, progress)?;
            match collection {
                Collection::Quizzes => report.quizzes = removed,
                Collection::Questions => report.questions = removed,
                Collection::Answers => report.answers = removed,
            }
        }
        Ok(report)
    }

    /// Values of `attribute` that occur on more than one record.
    pub fn find_duplicates(
        &self,
        collection: Collection,
        attribute: &str,
    ) -> StoreResult<Vec<Value>> {
        self.store.find_duplicate_values(collection, attribute)
    }

    pub fn has_duplicates(&self, collection: Collection, attribute: &str) -> StoreResult<bool> {
        Ok(!self.find_duplicates(collection, attribute)?.is_empty())
    }

    /// Removes records whose `attribute` equals `value`, each through the
    /// cascading remover of its collection.
    pub fn remove_duplicates(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
        policy: DuplicatePolicy,
    ) -> MutationResult<CascadeReport> {
        let matches = self.store.find_all(collection, attribute, value)?;
        let skip = match policy {
            DuplicatePolicy::RemoveAllMatching => 0,
            DuplicatePolicy::RemoveAllButOne => 1,
        };

        let mut report = CascadeReport::default();
        for record in matches.iter().skip(skip) {
            report.merge(self.remove(collection, record.id)?);
        }

        debug!(
            "event=remove_duplicates module=mutator status=ok collection={} attribute={} matched={} policy={:?} removed={}",
            collection,
            attribute,
            matches.len(),
            policy,
            report.removed(collection)
        );
        Ok(report)
    }

    /// Finds every duplicated value of `attribute` and removes its records,
    /// reporting progress per duplicated value.
    pub fn remove_all_duplicates(
        &self,
        collection: Collection,
        attribute: &str,
        policy: DuplicatePolicy,
        progress: &mut dyn ProgressSink,
    ) -> MutationResult<CascadeReport> {
        let label = "Removing Duplicates";
        let started_at = Instant::now();
        let duplicated = self.find_duplicates(collection, attribute)?;
        let total = duplicated.len();
        progress.begin(label, total);

        let mut report = CascadeReport::default();
        for (index, value) in duplicated.iter().enumerate() {
            stop_if_requested(progress, index, total)?;
            report.merge(self.remove_duplicates(collection, attribute, value, policy)?);
            progress.advance(index + 1, total);
        }

        progress.finish(label, total);
        info!(
            "event=remove_all_duplicates module=mutator status=ok collection={} attribute={} groups={} removed={} duration_ms={}",
            collection,
            attribute,
            total,
            report.total(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}

fn stop_if_requested(
    progress: &dyn ProgressSink,
    processed: usize,
    total: usize,
) -> MutationResult<()> {
    if progress.should_stop() {
        warn!("event=batch module=mutator status=cancelled processed={processed} total={total}");
        return Err(MutationError::Cancelled { processed, total });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CascadeReport, DuplicatePolicy};
    use crate::model::collection::Collection;

    #[test]
    fn default_policy_keeps_legacy_remove_all() {
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::RemoveAllMatching);
    }

    #[test]
    fn report_merges_counts_per_collection() {
        let mut report = CascadeReport::default();
        report.record(Collection::Answers);
        report.record(Collection::Answers);
        let mut other = CascadeReport::default();
        other.record(Collection::Questions);
        report.merge(other);
        assert_eq!(report.removed(Collection::Answers), 2);
        assert_eq!(report.removed(Collection::Questions), 1);
        assert_eq!(report.total(), 3);
        assert!(!report.is_empty());
    }
}
