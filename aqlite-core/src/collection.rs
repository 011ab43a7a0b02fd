//! Collection handles for document operations.
//!
//! A [`Collection`] is a lightweight, named view over a [`DatabaseBackend`]. It is
//! obtained from [`Database::collection`](crate::store::Database::collection), which
//! verifies that the collection exists, and then forwards every call to the backend
//! by name. Because the handle holds no documents of its own, deleting the
//! collection through another path is observed by the next call, which fails with
//! 404/1203.
//!
//! # Example
//!
//! ```ignore
//! use aqlite::prelude::*;
//! use serde_json::json;
//!
//! # fn example(db: &Database<impl DatabaseBackend>) -> DatabaseResult<()> {
//! let users = db.collection("users")?;
//! let john = users.insert(json!({ "name": "john" }), WriteOptions::new())?;
//! let again = users.get(Some("1"))?;
//! # Ok(()) }
//! ```

use serde_json::Value;

use crate::{
    backend::{CollectionInfo, DatabaseBackend},
    document::{CollectionType, WriteOptions},
    error::DatabaseResult,
};

/// A named collection bound to a backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: DatabaseBackend + ?Sized> {
    info: CollectionInfo,
    backend: &'a B,
}

impl<'a, B: DatabaseBackend + ?Sized> Collection<'a, B> {
    /// Creates a collection handle (internal use).
    pub(crate) fn new(info: CollectionInfo, backend: &'a B) -> Self {
        Self { info, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns whether this is a document or an edge collection.
    pub fn collection_type(&self) -> CollectionType {
        self.info.collection_type
    }

    /// Retrieves a document by key.
    ///
    /// # Returns
    ///
    /// The decorated document, or `None` if `key` is `None` or unknown.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`](crate::error::DatabaseError) if the collection is gone.
    pub fn get(&self, key: Option<&str>) -> DatabaseResult<Option<Value>> {
        self.backend.get_document(self.name(), key)
    }

    /// Inserts a document.
    ///
    /// # Arguments
    ///
    /// * `document` - A JSON object; `_key` selects the key, `_id` is ignored
    /// * `options` - `overwrite` and `ignore_errors` are honored
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`](crate::error::DatabaseError) on key, uniqueness or edge violations.
    pub fn insert(&self, document: Value, options: WriteOptions) -> DatabaseResult<Option<Value>> {
        self.backend
            .insert_document(self.name(), document, options)
    }

    /// Replaces the document stored under `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - The key of the document to replace
    /// * `document` - The new content; its `_rev` is compared when `check_revs` is set
    /// * `options` - `ignore_errors` and `check_revs` are honored
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`](crate::error::DatabaseError) if the document is missing or the revision differs.
    pub fn replace(&self, key: &str, document: Value, options: WriteOptions) -> DatabaseResult<Option<Value>> {
        self.backend
            .replace_document(self.name(), key, document, options)
    }

    /// Removes the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatabaseError`](crate::error::DatabaseError) if the document is missing or the revision differs.
    pub fn remove(&self, key: &str, rev: Option<&str>, options: WriteOptions) -> DatabaseResult<()> {
        self.backend
            .remove_document(self.name(), key, rev, options)
    }

    /// Removes every document in the collection.
    pub fn truncate(&self) -> DatabaseResult<()> {
        self.backend.truncate_collection(self.name())
    }

    /// Returns every document in the collection, in no particular order.
    pub fn all(&self) -> DatabaseResult<Vec<Value>> {
        self.backend.documents(self.name())
    }
}
