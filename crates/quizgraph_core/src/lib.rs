//! Core of the quiz dataset service.
//! Owns the record store, the reference graph between quizzes, questions and
//! answers, and the maintenance and query services built on it.

pub mod config;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use graph::{links, ChildCondition, ChildLink, CollectionLinks, GraphError, ParentLink};
pub use logging::{default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget};
pub use model::collection::{Collection, UnknownCollection};
pub use model::document::{Document, DocumentError, ID_KEY};
pub use model::object_id::{ObjectId, ObjectIdParseError};
pub use model::quiz::{Answer, ExpandedQuestion, ExpandedQuiz, Question, Quiz};
pub use repo::record_store::{RecordStore, SqliteRecordStore, StoreError, StoreResult};
pub use service::mutator::{
    CascadeReport, CascadingMutator, DuplicatePolicy, MutationError, MutationResult,
};
pub use service::progress::{CancelFlag, Cancellable, LogProgress, NoProgress, ProgressSink};
pub use service::query::{address_for_name, QueryError, QueryFacade, QueryResult};
pub use service::validator::{IntegrityValidator, RecordIssues, ValidateError, ValidationReport};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
