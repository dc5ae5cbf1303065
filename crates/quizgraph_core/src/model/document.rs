//! Schemaless stored document.
//!
//! # Responsibility
//! - Carry one stored record as `_id` plus a JSON field map.
//! - Convert between raw documents and typed records.
//!
//! # Invariants
//! - `fields` never contains the `_id` key; the id lives in `id` only.

use crate::model::object_id::ObjectId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key under which the document id is exposed in JSON form.
pub const ID_KEY: &str = "_id";

/// Errors converting between JSON values, documents and typed records.
#[derive(Debug)]
pub enum DocumentError {
    /// Value is not a JSON object.
    NotAnObject,
    /// Object has no `_id` key.
    MissingId,
    /// `_id` is present but not a 24-hex string.
    InvalidId(String),
    /// Typed (de)serialization failed.
    Serde(serde_json::Error),
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "document must be a JSON object"),
            Self::MissingId => write!(f, "document has no `{ID_KEY}` field"),
            Self::InvalidId(value) => write!(f, "document has invalid `{ID_KEY}`: {value}"),
            Self::Serde(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serde(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// One stored record in raw form.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: ObjectId,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Creates a document, dropping any stray `_id` entry from `fields`.
    pub fn new(id: ObjectId, mut fields: Map<String, Value>) -> Self {
        fields.remove(ID_KEY);
        Self { id, fields }
    }

    /// Returns one field value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Renders the document as one JSON object including `_id`.
    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(self.fields.len() + 1);
        object.insert(ID_KEY.to_string(), Value::String(self.id.to_hex()));
        for (key, value) in &self.fields {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }

    /// Parses a JSON object carrying an `_id` key.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let Value::Object(mut object) = value else {
            return Err(DocumentError::NotAnObject);
        };
        let id = match object.remove(ID_KEY) {
            Some(Value::String(text)) => {
                ObjectId::parse_str(&text).map_err(|_| DocumentError::InvalidId(text))?
            }
            Some(other) => return Err(DocumentError::InvalidId(other.to_string())),
            None => return Err(DocumentError::MissingId),
        };
        Ok(Self { id, fields: object })
    }

    /// Serializes a typed record into a document.
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self, DocumentError> {
        Self::from_value(serde_json::to_value(record)?)
    }

    /// Deserializes this document into a typed record.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T, DocumentError> {
        Ok(serde_json::from_value(self.to_value())?)
    }
}

#[cfg(test)]
mod tests {
    use super::{Document, DocumentError, ID_KEY};
    use crate::model::object_id::ObjectId;
    use serde_json::json;

    #[test]
    fn from_value_splits_id_from_fields() {
        let id = ObjectId::new();
        let doc = Document::from_value(json!({"_id": id.to_hex(), "address": "a"})).unwrap();
        assert_eq!(doc.id, id);
        assert!(doc.get(ID_KEY).is_none());
        assert_eq!(doc.get("address"), Some(&json!("a")));
        assert_eq!(doc.to_value()["_id"], json!(id.to_hex()));
    }

    #[test]
    fn from_value_rejects_missing_or_bad_id() {
        assert!(matches!(
            Document::from_value(json!({"address": "a"})),
            Err(DocumentError::MissingId)
        ));
        assert!(matches!(
            Document::from_value(json!({"_id": 7})),
            Err(DocumentError::InvalidId(_))
        ));
        assert!(matches!(
            Document::from_value(json!([1, 2])),
            Err(DocumentError::NotAnObject)
        ));
    }
}
