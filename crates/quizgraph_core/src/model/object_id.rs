//! Document identifier model.
//!
//! # Responsibility
//! - Represent the 12-byte document id used by all three collections.
//! - Parse and render the canonical 24-hex-character string form.
//!
//! # Invariants
//! - String form is always lowercase hex, exactly 24 characters.
//! - Parsing accepts either case and normalizes on output.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

const OBJECT_ID_BYTES: usize = 12;

static OBJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("valid object id regex"));

/// Stable identifier of one stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_BYTES]);

/// Error for text that is not a 24-hex-character id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdParseError(String);

impl Display for ObjectIdParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid object id `{}`", self.0)
    }
}

impl Error for ObjectIdParseError {}

impl ObjectId {
    /// Generates a fresh random id.
    pub fn new() -> Self {
        let random = Uuid::new_v4();
        let mut bytes = [0_u8; OBJECT_ID_BYTES];
        bytes.copy_from_slice(&random.as_bytes()[..OBJECT_ID_BYTES]);
        Self(bytes)
    }

    /// Returns the canonical lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// Parses the 24-hex-character form.
    pub fn parse_str(value: &str) -> Result<Self, ObjectIdParseError> {
        if !OBJECT_ID_RE.is_match(value) {
            return Err(ObjectIdParseError(value.to_string()));
        }

        let mut bytes = [0_u8; OBJECT_ID_BYTES];
        for (index, slot) in bytes.iter_mut().enumerate() {
            let pair = &value[index * 2..index * 2 + 2];
            *slot = u8::from_str_radix(pair, 16)
                .map_err(|_| ObjectIdParseError(value.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ObjectIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_str(&text).map_err(D::Error::custom)
    }
}
