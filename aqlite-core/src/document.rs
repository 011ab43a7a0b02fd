//! Document model helpers.
//!
//! Documents are plain JSON objects. Two pseudo-fields, `_key` and `_id`, are
//! computed on every read and never stored; `_rev` is stored and replaced on
//! every successful write.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{DatabaseError, DatabaseResult};

/// A JSON object, the stored and returned form of a document.
pub type JsonObject = Map<String, Value>;

pub const KEY_FIELD: &str = "_key";
pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";
pub const FROM_FIELD: &str = "_from";
pub const TO_FIELD: &str = "_to";

const REVISION_ALPHABET: &[u8; 64] =
    b"-_ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const REVISION_LENGTH: usize = 10;

/// Kind of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Plain documents.
    #[default]
    Document,
    /// Documents that must carry `_from` and `_to`.
    Edge,
}

/// Options recognized by document writes.
///
/// The default is a strict write: no overwrite, errors raised, revisions
/// not checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WriteOptions {
    /// Insert replaces an existing document with the same key.
    pub overwrite: bool,
    /// Conditions that would raise an error return `None` instead.
    pub ignore_errors: bool,
    /// Replace and remove fail unless the caller's `_rev` matches the stored one.
    pub check_revs: bool,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    pub fn check_revs(mut self, check_revs: bool) -> Self {
        self.check_revs = check_revs;
        self
    }
}

/// Generates a fresh revision token.
///
/// The token is short and random. It is unique enough to detect concurrent
/// writes but carries no ordering or security guarantee.
pub fn new_revision() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut revision = String::with_capacity(REVISION_LENGTH + 1);
    revision.push('_');

    for _ in 0..REVISION_LENGTH {
        revision.push(REVISION_ALPHABET[(bits & 0x3f) as usize] as char);
        bits >>= 6;
    }

    revision
}

/// Returns a copy of `stored` with `_key` and `_id` attached.
pub fn decorate(collection: &str, key: &str, stored: &JsonObject) -> Value {
    let mut document = JsonObject::with_capacity(stored.len() + 2);
    document.insert(KEY_FIELD.to_string(), Value::String(key.to_string()));
    document.insert(ID_FIELD.to_string(), Value::String(format!("{collection}/{key}")));

    for (field, value) in stored {
        document.insert(field.clone(), value.clone());
    }

    Value::Object(document)
}

/// Removes the pseudo-fields from a document about to be stored.
pub fn strip_pseudo_fields(document: &mut JsonObject) {
    document.remove(KEY_FIELD);
    document.remove(ID_FIELD);
}

/// Reads `_rev` from a document if it is a string.
pub fn revision_of(document: &JsonObject) -> Option<&str> {
    document.get(REV_FIELD).and_then(Value::as_str)
}

/// Checks that `_from` and `_to` are present strings containing a `/`.
///
/// # Errors
///
/// Returns 400/1233 otherwise.
pub fn validate_edge(document: &JsonObject) -> DatabaseResult<()> {
    let valid = |field: &str| {
        document
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|handle| !handle.is_empty() && handle.contains('/'))
    };

    if !valid(FROM_FIELD) || !valid(TO_FIELD) {
        return Err(DatabaseError::invalid_edge_attribute());
    }

    Ok(())
}

/// Converts a value into a document object.
///
/// # Errors
///
/// Non-object values are rejected with 400/1227.
pub fn into_object(value: Value) -> DatabaseResult<JsonObject> {
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(DatabaseError::invalid_document_type()),
    }
}
