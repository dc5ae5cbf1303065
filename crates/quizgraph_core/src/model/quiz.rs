//! Typed quiz, question and answer records.
//!
//! # Responsibility
//! - Define the typed projections of the three stored collections.
//! - Define the expanded (denormalized-on-read) shapes served to API callers.
//!
//! # Invariants
//! - Reference lists keep storage order; expansion preserves that order.
//! - Unknown fields survive a read/write cycle through `metadata`.

use crate::model::object_id::ObjectId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Quiz record. Owns its questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// External source URL; expected unique.
    pub address: String,
    /// Ingestion finished for this quiz.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub complete: bool,
    /// Excluded from parsing.
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub omit: bool,
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub questions: Vec<ObjectId>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Quiz {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(),
            address: address.into(),
            complete: false,
            omit: false,
            questions: Vec::new(),
            metadata: Map::new(),
        }
    }
}

/// Question record. Owned by one quiz, owns its answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Parent quiz id.
    pub quiz: ObjectId,
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub answers: Vec<ObjectId>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Question {
    pub fn new(quiz: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            quiz,
            answers: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Adds one metadata field, e.g. question text.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Answer record. Owned by one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Parent question id.
    pub question: ObjectId,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Answer {
    pub fn new(question: ObjectId) -> Self {
        Self {
            id: ObjectId::new(),
            question,
            metadata: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Quiz with question ids replaced by full expanded questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedQuiz {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub address: String,
    pub complete: bool,
    pub omit: bool,
    pub questions: Vec<ExpandedQuestion>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Question with answer ids replaced by full answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedQuestion {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub quiz: ObjectId,
    pub answers: Vec<Answer>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

// Older ingestion runs wrote flags as the strings "true"/"false".
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(flag) => Ok(flag),
        Value::String(text) => Ok(text.eq_ignore_ascii_case("true")),
        Value::Null => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "expected boolean flag, got {other}"
        ))),
    }
}

// A stored `null` child list means no children.
fn deserialize_id_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<ObjectId>, D::Error> {
    Ok(Option::<Vec<ObjectId>>::deserialize(deserializer)?.unwrap_or_default())
}
