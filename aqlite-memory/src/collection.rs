//! Stored form of a single in-memory collection.
//!
//! Documents are kept as JSON objects without `_key` and `_id`; both are attached again
//! on every read. Reads always hand out copies.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace};

use aqlite_core::{
    backend::CollectionInfo,
    document::{
        CollectionType, JsonObject, KEY_FIELD, REV_FIELD, WriteOptions, decorate, into_object,
        new_revision, revision_of, strip_pseudo_fields, validate_edge,
    },
    document_id::validate_key,
    error::{DatabaseError, DatabaseResult},
};

/// One named set of documents.
#[derive(Debug, Clone)]
pub struct MemoryCollection {
    name: String,
    collection_type: CollectionType,
    /// key -> stored document
    documents: HashMap<String, JsonObject>,
    next_key: u64,
}

impl MemoryCollection {
    /// Creates an empty collection. The name is not validated here.
    pub fn new(name: impl Into<String>, collection_type: CollectionType) -> Self {
        Self {
            name: name.into(),
            collection_type,
            documents: HashMap::new(),
            next_key: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection_type(&self) -> CollectionType {
        self.collection_type
    }

    pub fn info(&self) -> CollectionInfo {
        CollectionInfo {
            name: self.name.clone(),
            collection_type: self.collection_type,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Returns a decorated copy of the document stored under `key`.
    pub fn get(&self, key: Option<&str>) -> Option<Value> {
        let key = key?;
        self.documents
            .get(key)
            .map(|stored| decorate(&self.name, key, stored))
    }

    /// Inserts a document.
    ///
    /// The key comes from `_key` when present and is generated otherwise. An existing
    /// key is replaced only with `overwrite`; otherwise the insert fails with 409/1210,
    /// or returns `None` with `ignore_errors`.
    ///
    /// # Errors
    ///
    /// 400/1227 for a non-object, 400/1221 for an illegal key, 409/1210 for a taken key
    /// and 400/1233 for an edge without valid `_from` / `_to`.
    pub fn insert(&mut self, document: Value, options: WriteOptions) -> DatabaseResult<Option<Value>> {
        let mut object = into_object(document)?;

        let key = match object.get(KEY_FIELD) {
            Some(Value::String(key)) => key.clone(),
            Some(other) => return Err(DatabaseError::illegal_key(&other.to_string())),
            None => self.generate_key(),
        };
        validate_key(&key)?;

        if self.documents.contains_key(&key) && !options.overwrite {
            if options.ignore_errors {
                debug!(collection = %self.name, key = %key, "ignoring insert of existing key");
                return Ok(None);
            }
            return Err(DatabaseError::unique_constraint_violated(&key));
        }

        self.validate_type(&object)?;

        Ok(Some(self.store(key, &mut object)))
    }

    /// Replaces the document stored under `key`.
    ///
    /// With `check_revs` the incoming `_rev` must equal the stored revision.
    ///
    /// # Errors
    ///
    /// 404/1202 if `key` is unknown, 409/1200 on a revision mismatch, 400/1227 for a
    /// non-object and 400/1233 for an invalid edge. The first two become `Ok(None)`
    /// with `ignore_errors`.
    pub fn replace(&mut self, key: &str, document: Value, options: WriteOptions) -> DatabaseResult<Option<Value>> {
        let Some(existing) = self.documents.get(key) else {
            return self.ignorable(options, key, DatabaseError::document_not_found());
        };

        let mut object = into_object(document)?;

        if options.check_revs && revision_of(existing) != revision_of(&object) {
            return self.ignorable(options, key, DatabaseError::conflict());
        }

        self.validate_type(&object)?;

        Ok(Some(self.store(key.to_string(), &mut object)))
    }

    /// Removes the document stored under `key`.
    ///
    /// With `check_revs`, `rev` must equal the stored revision.
    ///
    /// # Errors
    ///
    /// 404/1202 if `key` is unknown, 409/1200 on a revision mismatch. Both are
    /// silent with `ignore_errors`.
    pub fn remove(&mut self, key: &str, rev: Option<&str>, options: WriteOptions) -> DatabaseResult<()> {
        let Some(existing) = self.documents.get(key) else {
            return self
                .ignorable(options, key, DatabaseError::document_not_found())
                .map(drop);
        };

        if options.check_revs && revision_of(existing) != rev {
            return self
                .ignorable(options, key, DatabaseError::conflict())
                .map(drop);
        }

        self.documents.remove(key);
        trace!(collection = %self.name, key, "removed document");

        Ok(())
    }

    /// Removes every document. Generated keys keep counting from where they were.
    pub fn truncate(&mut self) {
        self.documents.clear();
    }

    /// Decorated copies of every document, in no particular order.
    pub fn documents(&self) -> Vec<Value> {
        self.documents
            .iter()
            .map(|(key, stored)| decorate(&self.name, key, stored))
            .collect()
    }

    fn generate_key(&mut self) -> String {
        loop {
            self.next_key += 1;
            let key = self.next_key.to_string();
            if !self.documents.contains_key(&key) {
                return key;
            }
        }
    }

    fn validate_type(&self, object: &JsonObject) -> DatabaseResult<()> {
        match self.collection_type {
            CollectionType::Edge => validate_edge(object),
            CollectionType::Document => Ok(()),
        }
    }

    fn store(&mut self, key: String, object: &mut JsonObject) -> Value {
        strip_pseudo_fields(object);
        object.insert(REV_FIELD.to_string(), Value::String(new_revision()));

        let document = decorate(&self.name, &key, object);
        trace!(collection = %self.name, key = %key, "stored document");

        self.documents.insert(key, std::mem::take(object));
        document
    }

    fn ignorable(&self, options: WriteOptions, key: &str, err: DatabaseError) -> DatabaseResult<Option<Value>> {
        if options.ignore_errors {
            debug!(collection = %self.name, key, error_num = err.error_num, "ignoring failed write");
            return Ok(None);
        }
        Err(err)
    }
}
