//! Storage backend abstraction for the database.
//!
//! This module defines the contract every storage implementation fulfils, so that the
//! [`Database`](crate::store::Database) front object, the function registry and the
//! query executor work unchanged over the in-memory backend or a networked one.
//!
//! # Overview
//!
//! The [`DatabaseBackend`] trait covers collection management, single-document CRUD and
//! collection enumeration. Every method addresses a collection by name and resolves it on
//! each call, so collections created or deleted after a caller obtained the backend are
//! always visible.
//!
//! Implementations must raise [`DatabaseError`](crate::error::DatabaseError) with the same
//! numeric codes for the same conditions:
//!
//! | Condition                            | Status | Code |
//! |--------------------------------------|--------|------|
//! | illegal collection name              | 400    | 1208 |
//! | illegal or missing document key      | 400    | 1221 |
//! | duplicate collection name            | 409    | 1207 |
//! | collection not found                 | 404    | 1203 |
//! | unique constraint violated           | 409    | 1210 |
//! | document not found                   | 404    | 1202 |
//! | revision conflict                    | 409    | 1200 |
//! | invalid `_from` / `_to` on an edge   | 400    | 1233 |
//!
//! # Example
//!
//! ```ignore
//! use aqlite::backend::DatabaseBackend;
//! use aqlite::document::{CollectionType, WriteOptions};
//! use serde_json::json;
//!
//! let backend = MyBackendImpl::new();
//! backend.create_collection("users", CollectionType::Document)?;
//! let created = backend.insert_document("users", json!({ "name": "john" }), WriteOptions::new())?;
//! # Ok::<(), aqlite::error::DatabaseError>(())
//! ```

use serde_json::Value;
use std::fmt::Debug;

use crate::{
    document::{CollectionType, WriteOptions},
    error::DatabaseResult,
};

/// Describes an existing collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    /// The collection name.
    pub name: String,
    /// Whether the collection holds documents or edges.
    pub collection_type: CollectionType,
}

/// Abstract interface for document storage backends.
///
/// # Documents
///
/// Documents cross this interface as JSON values. Returned documents are always copies
/// carrying the `_key`, `_id` and `_rev` attributes; mutating them never affects stored
/// state. Incoming `_key` / `_id` attributes are never persisted.
///
/// # Thread Safety
///
/// Backends are `Send + Sync` and take `&self`. A single call is atomic with respect
/// to the document it touches; nothing spanning several calls is.
pub trait DatabaseBackend: Send + Sync + Debug {
    /// Creates an empty collection.
    ///
    /// # Errors
    ///
    /// 400/1208 if the name is illegal, 409/1207 if it is taken.
    fn create_collection(&self, name: &str, collection_type: CollectionType) -> DatabaseResult<CollectionInfo>;

    /// Deletes a collection and all its documents.
    ///
    /// # Errors
    ///
    /// 404/1203 if the collection does not exist.
    fn delete_collection(&self, name: &str) -> DatabaseResult<()>;

    /// Looks up a collection by name.
    ///
    /// This is the single lookup path; every document operation resolves its
    /// collection the same way.
    ///
    /// # Errors
    ///
    /// 404/1203 if the collection does not exist.
    fn collection_info(&self, name: &str) -> DatabaseResult<CollectionInfo>;

    /// Lists the names of all collections.
    fn list_collections(&self) -> DatabaseResult<Vec<String>>;

    /// Reads one document.
    ///
    /// A `None` or unknown key yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// 404/1203 if the collection does not exist.
    fn get_document(&self, collection: &str, key: Option<&str>) -> DatabaseResult<Option<Value>>;

    /// Inserts one document.
    ///
    /// The key is taken from `_key` when present, otherwise generated. Returns the stored
    /// document, or `None` when `ignore_errors` turned a failure into a no-op.
    ///
    /// # Errors
    ///
    /// 404/1203, 400/1221, 409/1210 or 400/1233 as described in the module docs.
    fn insert_document(
        &self,
        collection: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>>;

    /// Replaces the document stored under `key`.
    ///
    /// With `check_revs`, the incoming `_rev` must equal the stored one.
    ///
    /// # Errors
    ///
    /// 404/1203, 404/1202, 409/1200 or 400/1233 as described in the module docs.
    fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>>;

    /// Removes the document stored under `key`.
    ///
    /// With `check_revs`, `rev` must equal the stored revision.
    ///
    /// # Errors
    ///
    /// 404/1203, 404/1202 or 409/1200 as described in the module docs.
    fn remove_document(
        &self,
        collection: &str,
        key: &str,
        rev: Option<&str>,
        options: WriteOptions,
    ) -> DatabaseResult<()>;

    /// Removes every document from a collection.
    ///
    /// # Errors
    ///
    /// 404/1203 if the collection does not exist.
    fn truncate_collection(&self, collection: &str) -> DatabaseResult<()>;

    /// Returns every document of a collection, in no particular order.
    ///
    /// # Errors
    ///
    /// 404/1203 if the collection does not exist.
    fn documents(&self, collection: &str) -> DatabaseResult<Vec<Value>>;
}

impl<B> DatabaseBackend for &B
where
    B: DatabaseBackend + ?Sized,
{
    fn create_collection(&self, name: &str, collection_type: CollectionType) -> DatabaseResult<CollectionInfo> {
        (**self).create_collection(name, collection_type)
    }

    fn delete_collection(&self, name: &str) -> DatabaseResult<()> {
        (**self).delete_collection(name)
    }

    fn collection_info(&self, name: &str) -> DatabaseResult<CollectionInfo> {
        (**self).collection_info(name)
    }

    fn list_collections(&self) -> DatabaseResult<Vec<String>> {
        (**self).list_collections()
    }

    fn get_document(&self, collection: &str, key: Option<&str>) -> DatabaseResult<Option<Value>> {
        (**self).get_document(collection, key)
    }

    fn insert_document(
        &self,
        collection: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>> {
        (**self).insert_document(collection, document, options)
    }

    fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>> {
        (**self).replace_document(collection, key, document, options)
    }

    fn remove_document(
        &self,
        collection: &str,
        key: &str,
        rev: Option<&str>,
        options: WriteOptions,
    ) -> DatabaseResult<()> {
        (**self).remove_document(collection, key, rev, options)
    }

    fn truncate_collection(&self, collection: &str) -> DatabaseResult<()> {
        (**self).truncate_collection(collection)
    }

    fn documents(&self, collection: &str) -> DatabaseResult<Vec<Value>> {
        (**self).documents(collection)
    }
}

impl<B> DatabaseBackend for Box<B>
where
    B: DatabaseBackend + ?Sized,
{
    fn create_collection(&self, name: &str, collection_type: CollectionType) -> DatabaseResult<CollectionInfo> {
        (**self).create_collection(name, collection_type)
    }

    fn delete_collection(&self, name: &str) -> DatabaseResult<()> {
        (**self).delete_collection(name)
    }

    fn collection_info(&self, name: &str) -> DatabaseResult<CollectionInfo> {
        (**self).collection_info(name)
    }

    fn list_collections(&self) -> DatabaseResult<Vec<String>> {
        (**self).list_collections()
    }

    fn get_document(&self, collection: &str, key: Option<&str>) -> DatabaseResult<Option<Value>> {
        (**self).get_document(collection, key)
    }

    fn insert_document(
        &self,
        collection: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>> {
        (**self).insert_document(collection, document, options)
    }

    fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>> {
        (**self).replace_document(collection, key, document, options)
    }

    fn remove_document(
        &self,
        collection: &str,
        key: &str,
        rev: Option<&str>,
        options: WriteOptions,
    ) -> DatabaseResult<()> {
        (**self).remove_document(collection, key, rev, options)
    }

    fn truncate_collection(&self, collection: &str) -> DatabaseResult<()> {
        (**self).truncate_collection(collection)
    }

    fn documents(&self, collection: &str) -> DatabaseResult<Vec<Value>> {
        (**self).documents(collection)
    }
}

/// Factory trait for constructing backend instances.
///
/// Builders carry backend configuration and validate it in [`build`](Self::build).
pub trait DatabaseBackendBuilder {
    /// The backend type produced.
    type Backend: DatabaseBackend;

    /// Builds the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    fn build(self) -> DatabaseResult<Self::Backend>;
}
