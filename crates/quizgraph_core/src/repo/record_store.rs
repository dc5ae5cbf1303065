//! Record store contract and SQLite document implementation.
//!
//! # Responsibility
//! - Provide attribute lookups and single-record mutations over the three
//!   collections.
//! - Keep SQL and JSON-path details inside the persistence boundary.
//!
//! # Invariants
//! - Every operation is a single statement; nothing spans documents.
//! - Listing order is insertion order (`rowid ASC`).
//! - The store knows nothing about references between collections.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::collection::Collection;
use crate::model::document::{Document, DocumentError, ID_KEY};
use crate::model::object_id::ObjectId;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use serde_json::{Number, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid attribute regex"));

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from record store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection has not been bootstrapped to the expected version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Attribute name is not a plain field name.
    InvalidAttribute(String),
    /// Match value is an array or object.
    UnsupportedValue(String),
    /// Insert collided with an existing id.
    DuplicateId { collection: Collection, id: ObjectId },
    /// Replace target does not exist.
    NotFound { collection: Collection, id: ObjectId },
    /// Persisted row cannot be turned into a document.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "record store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidAttribute(name) => write!(f, "invalid attribute name `{name}`"),
            Self::UnsupportedValue(value) => {
                write!(f, "unsupported match value {value}; expected a JSON scalar")
            }
            Self::DuplicateId { collection, id } => {
                write!(f, "{collection} already contains record {id}")
            }
            Self::NotFound { collection, id } => write!(f, "{collection} record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<DocumentError> for StoreError {
    fn from(value: DocumentError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// Attribute-level access to the three collections.
///
/// `attribute` is either `_id` or a top-level field name. Match values are
/// JSON scalars; `null` also matches a missing field.
pub trait RecordStore {
    /// First record (insertion order) whose attribute equals `value`.
    fn find_one(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
    ) -> StoreResult<Option<Document>>;
    /// Every record whose attribute equals `value`.
    fn find_all(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>>;
    /// Every record of one collection.
    fn all(&self, collection: Collection) -> StoreResult<Vec<Document>>;
    /// Inserts one record; fails with `DuplicateId` on id collision.
    fn insert(&self, collection: Collection, document: &Document) -> StoreResult<()>;
    /// Replaces one record body; fails with `NotFound` when absent.
    fn replace(&self, collection: Collection, document: &Document) -> StoreResult<()>;
    /// Sets `field` on the first record matching `attribute = value`.
    ///
    /// Returns `false` when nothing matched.
    fn update_field(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
        field: &str,
        new_value: &Value,
    ) -> StoreResult<bool>;
    /// Renames a field on every record that has it. Returns changed count.
    fn rename_field(&self, collection: Collection, from: &str, to: &str) -> StoreResult<usize>;
    /// Deletes one record. Returns `false` when no such record existed.
    fn delete(&self, collection: Collection, id: ObjectId) -> StoreResult<bool>;
    /// Number of records in one collection.
    fn count_all(&self, collection: Collection) -> StoreResult<usize>;
    /// Scalar values of `attribute` carried by more than one record, in
    /// first-seen order. Missing and `null` values are not grouped.
    fn find_duplicate_values(
        &self,
        collection: Collection,
        attribute: &str,
    ) -> StoreResult<Vec<Value>>;

    /// Loads one record by id.
    fn get(&self, collection: Collection, id: ObjectId) -> StoreResult<Option<Document>> {
        self.find_one(collection, ID_KEY, &Value::String(id.to_hex()))
    }

    /// Returns whether a record with `id` exists.
    fn exists(&self, collection: Collection, id: ObjectId) -> StoreResult<bool> {
        Ok(self.get(collection, id)?.is_some())
    }
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn find_one(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
    ) -> StoreResult<Option<Document>> {
        (**self).find_one(collection, attribute, value)
    }

    fn find_all(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        (**self).find_all(collection, attribute, value)
    }

    fn all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        (**self).all(collection)
    }

    fn insert(&self, collection: Collection, document: &Document) -> StoreResult<()> {
        (**self).insert(collection, document)
    }

    fn replace(&self, collection: Collection, document: &Document) -> StoreResult<()> {
        (**self).replace(collection, document)
    }

    fn update_field(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
        field: &str,
        new_value: &Value,
    ) -> StoreResult<bool> {
        (**self).update_field(collection, attribute, value, field, new_value)
    }

    fn rename_field(&self, collection: Collection, from: &str, to: &str) -> StoreResult<usize> {
        (**self).rename_field(collection, from, to)
    }

    fn delete(&self, collection: Collection, id: ObjectId) -> StoreResult<bool> {
        (**self).delete(collection, id)
    }

    fn count_all(&self, collection: Collection) -> StoreResult<usize> {
        (**self).count_all(collection)
    }

    fn find_duplicate_values(
        &self,
        collection: Collection,
        attribute: &str,
    ) -> StoreResult<Vec<Value>> {
        (**self).find_duplicate_values(collection, attribute)
    }

    fn get(&self, collection: Collection, id: ObjectId) -> StoreResult<Option<Document>> {
        (**self).get(collection, id)
    }

    fn exists(&self, collection: Collection, id: ObjectId) -> StoreResult<bool> {
        (**self).exists(collection, id)
    }
}

/// SQLite-backed record store. One table per collection, JSON bodies.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    /// Creates a store from a bootstrapped connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn select(
        &self,
        collection: Collection,
        predicate: Predicate,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Document>> {
        let mut sql = format!(
            "SELECT id, body FROM {} WHERE {} ORDER BY rowid ASC",
            collection.table(),
            predicate.sql
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(predicate.binds))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(collection, row)?);
        }
        Ok(documents)
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn find_one(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
    ) -> StoreResult<Option<Document>> {
        let predicate = match_predicate(attribute, value)?;
        Ok(self.select(collection, predicate, Some(1))?.into_iter().next())
    }

    fn find_all(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
    ) -> StoreResult<Vec<Document>> {
        let predicate = match_predicate(attribute, value)?;
        self.select(collection, predicate, None)
    }

    fn all(&self, collection: Collection) -> StoreResult<Vec<Document>> {
        self.select(collection, Predicate::always(), None)
    }

    fn insert(&self, collection: Collection, document: &Document) -> StoreResult<()> {
        let body = Value::Object(document.fields.clone()).to_string();
        let result = self.conn.execute(
            &format!("INSERT INTO {} (id, body) VALUES (?1, ?2);", collection.table()),
            params![document.id.to_hex(), body],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId {
                    collection,
                    id: document.id,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn replace(&self, collection: Collection, document: &Document) -> StoreResult<()> {
        let body = Value::Object(document.fields.clone()).to_string();
        let changed = self.conn.execute(
            &format!("UPDATE {} SET body = ?2 WHERE id = ?1;", collection.table()),
            params![document.id.to_hex(), body],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                collection,
                id: document.id,
            });
        }
        Ok(())
    }

    fn update_field(
        &self,
        collection: Collection,
        attribute: &str,
        value: &Value,
        field: &str,
        new_value: &Value,
    ) -> StoreResult<bool> {
        let field_path = writable_path(field)?;
        let predicate = match_predicate(attribute, value)?;
        let table = collection.table();
        let sql = format!(
            "UPDATE {table}
             SET body = json_set(body, ?, json(?))
             WHERE rowid = (
                SELECT rowid FROM {table} WHERE {} ORDER BY rowid ASC LIMIT 1
             );",
            predicate.sql
        );

        let mut binds = vec![SqlValue::Text(field_path), SqlValue::Text(new_value.to_string())];
        binds.extend(predicate.binds);
        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        Ok(changed > 0)
    }

    fn rename_field(&self, collection: Collection, from: &str, to: &str) -> StoreResult<usize> {
        let from_path = writable_path(from)?;
        let to_path = writable_path(to)?;
        if from_path == to_path {
            return Ok(0);
        }

        let changed = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET body = json_remove(json_set(body, ?2, json(body -> ?1)), ?1)
                 WHERE json_type(body, ?1) IS NOT NULL;",
                collection.table()
            ),
            params![from_path, to_path],
        )?;
        Ok(changed)
    }

    fn delete(&self, collection: Collection, id: ObjectId) -> StoreResult<bool> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", collection.table()),
            [id.to_hex()],
        )?;
        Ok(changed > 0)
    }

    fn count_all(&self, collection: Collection) -> StoreResult<usize> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {};", collection.table()),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count)
            .map_err(|_| StoreError::InvalidData(format!("negative row count {count}")))
    }

    fn find_duplicate_values(
        &self,
        collection: Collection,
        attribute: &str,
    ) -> StoreResult<Vec<Value>> {
        if attribute == ID_KEY {
            return Ok(Vec::new());
        }
        let path = attribute_path(attribute)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT CASE json_type(body, ?1)
                        WHEN 'integer' THEN 'number'
                        WHEN 'real' THEN 'number'
                        ELSE json_type(body, ?1)
                    END AS kind,
                    json_extract(body, ?1) AS value
             FROM {}
             WHERE json_type(body, ?1) IN ('true', 'false', 'integer', 'real', 'text')
             GROUP BY kind, value
             HAVING COUNT(*) > 1
             ORDER BY MIN(rowid) ASC;",
            collection.table()
        ))?;

        let mut rows = stmt.query([path])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let kind: String = row.get("kind")?;
            let raw: SqlValue = row.get("value")?;
            values.push(scalar_from_sql(&kind, raw)?);
        }
        Ok(values)
    }
}

/// SQL fragment plus positional bind values.
struct Predicate {
    sql: String,
    binds: Vec<SqlValue>,
}

impl Predicate {
    fn always() -> Self {
        Self {
            sql: "1 = 1".to_string(),
            binds: Vec::new(),
        }
    }

    fn never() -> Self {
        Self {
            sql: "1 = 0".to_string(),
            binds: Vec::new(),
        }
    }
}

fn match_predicate(attribute: &str, value: &Value) -> StoreResult<Predicate> {
    if attribute == ID_KEY {
        let id = match value {
            Value::String(text) => ObjectId::parse_str(text).ok(),
            _ => None,
        };
        return Ok(match id {
            Some(id) => Predicate {
                sql: "id = ?".to_string(),
                binds: vec![SqlValue::Text(id.to_hex())],
            },
            None => Predicate::never(),
        });
    }

    let path = attribute_path(attribute)?;
    let predicate = match value {
        Value::Null => Predicate {
            sql: "json_extract(body, ?) IS NULL".to_string(),
            binds: vec![SqlValue::Text(path)],
        },
        Value::Bool(flag) => Predicate {
            sql: "json_type(body, ?) = ?".to_string(),
            binds: vec![
                SqlValue::Text(path),
                SqlValue::Text(if *flag { "true" } else { "false" }.to_string()),
            ],
        },
        Value::Number(number) => {
            let bound = if let Some(integer) = number.as_i64() {
                SqlValue::Integer(integer)
            } else if let Some(real) = number.as_f64() {
                SqlValue::Real(real)
            } else {
                return Err(StoreError::UnsupportedValue(number.to_string()));
            };
            Predicate {
                sql: "(json_type(body, ?) IN ('integer', 'real') AND json_extract(body, ?) = ?)"
                    .to_string(),
                binds: vec![SqlValue::Text(path.clone()), SqlValue::Text(path), bound],
            }
        }
        Value::String(text) => Predicate {
            sql: "(json_type(body, ?) = 'text' AND json_extract(body, ?) = ?)".to_string(),
            binds: vec![
                SqlValue::Text(path.clone()),
                SqlValue::Text(path),
                SqlValue::Text(text.clone()),
            ],
        },
        Value::Array(_) | Value::Object(_) => {
            return Err(StoreError::UnsupportedValue(value.to_string()))
        }
    };
    Ok(predicate)
}

fn attribute_path(attribute: &str) -> StoreResult<String> {
    if !ATTRIBUTE_RE.is_match(attribute) {
        return Err(StoreError::InvalidAttribute(attribute.to_string()));
    }
    Ok(format!("$.{attribute}"))
}

fn writable_path(field: &str) -> StoreResult<String> {
    if field == ID_KEY {
        return Err(StoreError::InvalidAttribute(field.to_string()));
    }
    attribute_path(field)
}

fn scalar_from_sql(kind: &str, raw: SqlValue) -> StoreResult<Value> {
    let value = match (kind, raw) {
        ("true", _) => Value::Bool(true),
        ("false", _) => Value::Bool(false),
        // Integers and reals share one kind, matching `Number` lookups.
        ("number", SqlValue::Integer(integer)) => Value::Number(integer.into()),
        ("number", SqlValue::Real(real)) => Number::from_f64(real)
            .map(Value::Number)
            .ok_or_else(|| StoreError::InvalidData(format!("non-finite number {real}")))?,
        ("text", SqlValue::Text(text)) => Value::String(text),
        (kind, raw) => {
            return Err(StoreError::InvalidData(format!(
                "unexpected grouped value {raw:?} of json type `{kind}`"
            )))
        }
    };
    Ok(value)
}

fn parse_document_row(collection: Collection, row: &Row<'_>) -> StoreResult<Document> {
    let id_text: String = row.get("id")?;
    let id = ObjectId::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid id `{id_text}` in {collection}.id"))
    })?;

    let body_text: String = row.get("body")?;
    let fields = match serde_json::from_str::<Value>(&body_text) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) | Err(_) => {
            return Err(StoreError::InvalidData(format!(
                "record {id} in {collection} has a non-object body"
            )))
        }
    };
    Ok(Document::new(id, fields))
}
