//! Reference graph declaration for the three collections.
//!
//! # Responsibility
//! - Declare, per collection, its owned-children field and its parent
//!   back-reference field.
//! - Read those references out of raw documents.
//!
//! # Invariants
//! - `REFERENCE_GRAPH` is the only place reference fields are named; the
//!   validator and the cascading mutator both read it.
//! - Ownership runs quiz -> questions -> answers; back-references are never
//!   followed for deletion.

use crate::model::collection::Collection;
use crate::model::document::Document;
use crate::model::object_id::ObjectId;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// When a child-link invariant must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildCondition {
    /// Always checked.
    Always,
    /// Checked only when the named boolean field is true.
    WhenFlagSet(&'static str),
}

/// Owned-children reference: a list of ids in `field` pointing into
/// `collection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLink {
    pub field: &'static str,
    pub collection: Collection,
    pub condition: ChildCondition,
}

/// Parent back-reference: a single id in `field` pointing into `collection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub field: &'static str,
    pub collection: Collection,
}

/// Reference shape of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionLinks {
    pub collection: Collection,
    pub child: Option<ChildLink>,
    pub parent: Option<ParentLink>,
}

pub const REFERENCE_GRAPH: [CollectionLinks; 3] = [
    CollectionLinks {
        collection: Collection::Quizzes,
        child: Some(ChildLink {
            field: "questions",
            collection: Collection::Questions,
            condition: ChildCondition::WhenFlagSet("complete"),
        }),
        parent: None,
    },
    CollectionLinks {
        collection: Collection::Questions,
        child: Some(ChildLink {
            field: "answers",
            collection: Collection::Answers,
            condition: ChildCondition::Always,
        }),
        parent: Some(ParentLink {
            field: "quiz",
            collection: Collection::Quizzes,
        }),
    },
    CollectionLinks {
        collection: Collection::Answers,
        child: None,
        parent: Some(ParentLink {
            field: "question",
            collection: Collection::Questions,
        }),
    },
];

/// Returns the declared reference shape of `collection`.
pub fn links(collection: Collection) -> &'static CollectionLinks {
    match collection {
        Collection::Quizzes => &REFERENCE_GRAPH[0],
        Collection::Questions => &REFERENCE_GRAPH[1],
        Collection::Answers => &REFERENCE_GRAPH[2],
    }
}

/// A reference field that cannot be read as ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    MalformedReference {
        collection: Collection,
        id: ObjectId,
        field: &'static str,
    },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedReference {
                collection,
                id,
                field,
            } => write!(f, "{collection} record {id} has malformed reference field `{field}`"),
        }
    }
}

impl Error for GraphError {}

impl ChildLink {
    /// Returns whether the child invariant applies to `document`.
    pub fn applies_to(&self, document: &Document) -> bool {
        match self.condition {
            ChildCondition::Always => true,
            ChildCondition::WhenFlagSet(flag) => is_flag_set(document.get(flag)),
        }
    }

    /// Reads the ordered child ids. A missing or `null` field means no
    /// children.
    pub fn child_ids(
        &self,
        owner: Collection,
        document: &Document,
    ) -> Result<Vec<ObjectId>, GraphError> {
        let malformed = || GraphError::MalformedReference {
            collection: owner,
            id: document.id,
            field: self.field,
        };

        match document.get(self.field) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| read_id(item).ok_or_else(malformed))
                .collect(),
            Some(_) => Err(malformed()),
        }
    }
}

impl ParentLink {
    /// Reads the parent id. The field is required.
    pub fn parent_id(&self, owner: Collection, document: &Document) -> Result<ObjectId, GraphError> {
        document
            .get(self.field)
            .and_then(read_id)
            .ok_or(GraphError::MalformedReference {
                collection: owner,
                id: document.id,
                field: self.field,
            })
    }
}

fn read_id(value: &Value) -> Option<ObjectId> {
    match value {
        Value::String(text) => ObjectId::parse_str(text).ok(),
        _ => None,
    }
}

fn is_flag_set(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}
