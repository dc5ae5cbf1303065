//! Read-side composition for API callers.
//!
//! # Responsibility
//! - Look up quizzes by id or name and expand them into full trees.
//! - Serve address listings and random selections.
//!
//! # Invariants
//! - Reads only; nothing here mutates the store.
//! - Expansion is all-or-nothing: a dangling reference fails the whole read.
//! - Question numbers are 1-indexed.

use crate::model::collection::Collection;
use crate::model::document::DocumentError;
use crate::model::object_id::ObjectId;
use crate::model::quiz::{Answer, ExpandedQuestion, ExpandedQuiz, Question, Quiz};
use crate::repo::record_store::{RecordStore, StoreError};
use log::{debug, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Prefix that turns a quiz name into its stored `address`.
pub const QUIZ_ADDRESS_PREFIX: &str = "https://www.wizardingworld.com/quiz/";

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors from read-side queries.
#[derive(Debug)]
pub enum QueryError {
    /// Lookup returned no record.
    NotFound { collection: Collection, key: String },
    /// Question number outside `[1, len]`.
    OutOfBounds { requested: usize, len: usize },
    /// Random selection has no complete quiz to choose from.
    NoCompleteQuiz,
    /// Store failure.
    Store(StoreError),
    /// Stored record does not fit its typed shape.
    InvalidData(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { collection, key } => write!(f, "{collection} record not found: {key}"),
            Self::OutOfBounds { requested, len } => {
                write!(f, "question {requested} out of bounds for quiz with {len} questions")
            }
            Self::NoCompleteQuiz => write!(f, "no complete quiz available"),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored record: {message}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<DocumentError> for QueryError {
    fn from(value: DocumentError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Maps a quiz name to its stored address.
pub fn address_for_name(name: &str) -> String {
    format!("{QUIZ_ADDRESS_PREFIX}{name}")
}

/// Query facade over an injected record store. No caching: every call
/// re-reads the store.
pub struct QueryFacade<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> QueryFacade<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All quizzes, unexpanded, in store order. Records that do not fit the
    /// quiz shape are logged and left out.
    pub fn all_quizzes(&self) -> QueryResult<Vec<Quiz>> {
        let quizzes = self
            .store
            .all(Collection::Quizzes)?
            .into_iter()
            .filter_map(|document| {
                let id = document.id;
                match document.into_record::<Quiz>() {
                    Ok(quiz) => Some(quiz),
                    Err(err) => {
                        warn!("event=all_quizzes module=query status=skipped id={id} error={err}");
                        None
                    }
                }
            })
            .collect();
        Ok(quizzes)
    }

    pub fn quiz_by_id(&self, id: ObjectId) -> QueryResult<Quiz> {
        self.load(Collection::Quizzes, id)
    }

    pub fn quiz_by_address(&self, address: &str) -> QueryResult<Quiz> {
        let document = self
            .store
            .find_one(
                Collection::Quizzes,
                "address",
                &Value::String(address.to_string()),
            )?
            .ok_or_else(|| QueryError::NotFound {
                collection: Collection::Quizzes,
                key: address.to_string(),
            })?;
        Ok(document.into_record()?)
    }

    pub fn quiz_by_name(&self, name: &str) -> QueryResult<Quiz> {
        self.quiz_by_address(&address_for_name(name))
    }

    pub fn question_by_id(&self, id: ObjectId) -> QueryResult<Question> {
        self.load(Collection::Questions, id)
    }

    pub fn answer_by_id(&self, id: ObjectId) -> QueryResult<Answer> {
        self.load(Collection::Answers, id)
    }

    /// Replaces question ids with expanded questions, in list order.
    pub fn expand_quiz(&self, quiz: &Quiz) -> QueryResult<ExpandedQuiz> {
        let questions = quiz
            .questions
            .iter()
            .map(|id| {
                let question = self.question_by_id(*id)?;
                self.expand_question(&question)
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(ExpandedQuiz {
            id: quiz.id,
            address: quiz.address.clone(),
            complete: quiz.complete,
            omit: quiz.omit,
            questions,
            metadata: quiz.metadata.clone(),
        })
    }

    /// Replaces answer ids with full answers, in list order.
    pub fn expand_question(&self, question: &Question) -> QueryResult<ExpandedQuestion> {
        let answers = question
            .answers
            .iter()
            .map(|id| self.answer_by_id(*id))
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(ExpandedQuestion {
            id: question.id,
            quiz: question.quiz,
            answers,
            metadata: question.metadata.clone(),
        })
    }

    pub fn expanded_quiz_by_id(&self, id: ObjectId) -> QueryResult<ExpandedQuiz> {
        self.expand_quiz(&self.quiz_by_id(id)?)
    }

    pub fn expanded_quiz_by_name(&self, name: &str) -> QueryResult<ExpandedQuiz> {
        self.expand_quiz(&self.quiz_by_name(name)?)
    }

    /// Expands the `number`-th question (1-indexed) of `quiz`.
    pub fn quiz_question(&self, quiz: &Quiz, number: usize) -> QueryResult<ExpandedQuestion> {
        let len = quiz.questions.len();
        if number == 0 || number > len {
            return Err(QueryError::OutOfBounds {
                requested: number,
                len,
            });
        }
        let question = self.question_by_id(quiz.questions[number - 1])?;
        self.expand_question(&question)
    }

    /// Every quiz address, in store order.
    pub fn addresses(&self) -> QueryResult<Vec<String>> {
        self.addresses_where(|_| true)
    }

    /// Addresses of quizzes whose ingestion finished.
    pub fn parsed_addresses(&self) -> QueryResult<Vec<String>> {
        self.addresses_where(|quiz| quiz.complete)
    }

    /// Addresses still waiting for ingestion and not omitted.
    pub fn unparsed_addresses(&self) -> QueryResult<Vec<String>> {
        self.addresses_where(|quiz| !quiz.complete && !quiz.omit)
    }

    /// Addresses still waiting for ingestion, omitted ones included.
    pub fn all_unparsed_addresses(&self) -> QueryResult<Vec<String>> {
        self.addresses_where(|quiz| !quiz.complete)
    }

    /// Returns whether the quiz at `address` is flagged `omit`. Unknown
    /// addresses are not omitted.
    pub fn is_omitted(&self, address: &str) -> QueryResult<bool> {
        match self.quiz_by_address(address) {
            Ok(quiz) => Ok(quiz.omit),
            Err(QueryError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Picks a complete quiz uniformly, re-drawing on incomplete ones.
    pub fn random_complete_quiz<R: Rng>(&self, rng: &mut R) -> QueryResult<ObjectId> {
        let quizzes = self.all_quizzes()?;
        let (quiz, attempts) =
            sample_until(&quizzes, rng, |quiz| quiz.complete).ok_or(QueryError::NoCompleteQuiz)?;
        debug!("event=random_quiz module=query status=ok id={} attempts={attempts}", quiz.id);
        Ok(quiz.id)
    }

    /// Picks a complete quiz with questions and a 1-indexed question number.
    pub fn random_question<R: Rng>(
        &self,
        rng: &mut R,
    ) -> QueryResult<(ObjectId, usize)> {
        let quizzes = self.all_quizzes()?;
        let (quiz, _) = sample_until(&quizzes, rng, |quiz| {
            quiz.complete && !quiz.questions.is_empty()
        })
        .ok_or(QueryError::NoCompleteQuiz)?;
        let number = rng.gen_range(1..=quiz.questions.len());
        Ok((quiz.id, number))
    }

    // Flags are read through the typed model so legacy string flags count.
    fn addresses_where(&self, keep: impl Fn(&Quiz) -> bool) -> QueryResult<Vec<String>> {
        Ok(self
            .all_quizzes()?
            .into_iter()
            .filter(|quiz| keep(quiz))
            .map(|quiz| quiz.address)
            .collect())
    }

    fn load<T: DeserializeOwned>(&self, collection: Collection, id: ObjectId) -> QueryResult<T> {
        let document = self
            .store
            .get(collection, id)?
            .ok_or_else(|| QueryError::NotFound {
                collection,
                key: id.to_hex(),
            })?;
        Ok(document.into_record()?)
    }
}

/// Draws uniformly from `items` until `accept` holds. Returns the item and
/// the number of draws, or `None` when no item is acceptable.
pub(crate) fn sample_until<'a, T, R: Rng>(
    items: &'a [T],
    rng: &mut R,
    accept: impl Fn(&T) -> bool,
) -> Option<(&'a T, usize)> {
    if !items.iter().any(&accept) {
        return None;
    }

    let mut attempts = 0;
    loop {
        attempts += 1;
        let candidate = &items[rng.gen_range(0..items.len())];
        if accept(candidate) {
            return Some((candidate, attempts));
        }
    }
}
