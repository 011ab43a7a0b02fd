//! In-memory storage backend.
//!
//! [`InMemoryDatabase`] keeps every collection in a map behind a single read-write
//! lock. Each backend call takes the lock for the duration of that call only, so a
//! query may write to a collection while a `For` over the same collection is still
//! being iterated; the iteration works on the snapshot taken when it started.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use aqlite_core::{
    backend::{CollectionInfo, DatabaseBackend, DatabaseBackendBuilder},
    document::{CollectionType, WriteOptions},
    document_id::validate_collection_name,
    error::{DatabaseError, DatabaseResult},
};

use crate::collection::MemoryCollection;

type CollectionMap = HashMap<String, MemoryCollection>;

/// Thread-safe in-memory database backend.
///
/// # Thread Safety
///
/// `InMemoryDatabase` is cloneable and keeps its state behind an `Arc`, so clones
/// share the same collections. Single-document writes are atomic; nothing spanning
/// several calls is.
///
/// # Example
///
/// ```ignore
/// use aqlite_memory::InMemoryDatabase;
/// use aqlite::backend::DatabaseBackend;
/// use aqlite::document::{CollectionType, WriteOptions};
/// use serde_json::json;
///
/// let db = InMemoryDatabase::new();
/// db.create_collection("users", CollectionType::Document)?;
///
/// let john = db.insert_document("users", json!({ "name": "john" }), WriteOptions::new())?;
/// assert_eq!(db.get_document("users", Some("1"))?, john);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryDatabase {
    /// collection name -> collection
    collections: Arc<RwLock<CollectionMap>>,
}

impl InMemoryDatabase {
    /// Creates a new database without collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for a database with pre-created collections.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use aqlite_memory::InMemoryDatabase;
    ///
    /// let db = InMemoryDatabase::builder()
    ///     .collection("users", CollectionType::Document)
    ///     .collection("knows", CollectionType::Edge)
    ///     .build()?;
    /// ```
    pub fn builder() -> InMemoryDatabaseBuilder {
        InMemoryDatabaseBuilder::default()
    }

    fn read<R>(&self, name: &str, f: impl FnOnce(&MemoryCollection) -> R) -> DatabaseResult<R> {
        let collections = self.collections.read();
        let collection = collections
            .get(name)
            .ok_or_else(|| DatabaseError::collection_not_found(name))?;

        Ok(f(collection))
    }

    fn write<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut MemoryCollection) -> DatabaseResult<R>,
    ) -> DatabaseResult<R> {
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| DatabaseError::collection_not_found(name))?;

        f(collection)
    }
}

impl DatabaseBackend for InMemoryDatabase {
    fn create_collection(&self, name: &str, collection_type: CollectionType) -> DatabaseResult<CollectionInfo> {
        validate_collection_name(name)?;

        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(DatabaseError::duplicate_name(name));
        }

        let collection = MemoryCollection::new(name, collection_type);
        let info = collection.info();
        collections.insert(name.to_string(), collection);

        debug!(collection = name, ?collection_type, "created collection");

        Ok(info)
    }

    fn delete_collection(&self, name: &str) -> DatabaseResult<()> {
        match self.collections.write().remove(name) {
            Some(_) => {
                debug!(collection = name, "deleted collection");
                Ok(())
            }
            None => Err(DatabaseError::collection_not_found(name)),
        }
    }

    fn collection_info(&self, name: &str) -> DatabaseResult<CollectionInfo> {
        self.read(name, MemoryCollection::info)
    }

    fn list_collections(&self) -> DatabaseResult<Vec<String>> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .keys()
            .cloned()
            .collect();
        names.sort();

        Ok(names)
    }

    fn get_document(&self, collection: &str, key: Option<&str>) -> DatabaseResult<Option<Value>> {
        self.read(collection, |c| c.get(key))
    }

    fn insert_document(
        &self,
        collection: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>> {
        self.write(collection, |c| c.insert(document, options))
    }

    fn replace_document(
        &self,
        collection: &str,
        key: &str,
        document: Value,
        options: WriteOptions,
    ) -> DatabaseResult<Option<Value>> {
        self.write(collection, |c| c.replace(key, document, options))
    }

    fn remove_document(
        &self,
        collection: &str,
        key: &str,
        rev: Option<&str>,
        options: WriteOptions,
    ) -> DatabaseResult<()> {
        self.write(collection, |c| c.remove(key, rev, options))
    }

    fn truncate_collection(&self, collection: &str) -> DatabaseResult<()> {
        self.write(collection, |c| {
            c.truncate();
            debug!(collection = c.name(), "truncated collection");
            Ok(())
        })
    }

    fn documents(&self, collection: &str) -> DatabaseResult<Vec<Value>> {
        self.read(collection, MemoryCollection::documents)
    }
}

/// Builder for [`InMemoryDatabase`].
///
/// Collections registered here are created by [`build`](DatabaseBackendBuilder::build)
/// in registration order.
#[derive(Default, Debug, Clone)]
pub struct InMemoryDatabaseBuilder {
    collections: Vec<(String, CollectionType)>,
}

impl InMemoryDatabaseBuilder {
    /// Registers a collection to create.
    pub fn collection(mut self, name: impl Into<String>, collection_type: CollectionType) -> Self {
        self.collections.push((name.into(), collection_type));
        self
    }
}

impl DatabaseBackendBuilder for InMemoryDatabaseBuilder {
    type Backend = InMemoryDatabase;

    /// Builds the database.
    ///
    /// # Errors
    ///
    /// 400/1208 for an illegal collection name, 409/1207 if a name is registered twice.
    fn build(self) -> DatabaseResult<InMemoryDatabase> {
        let database = InMemoryDatabase::new();

        for (name, collection_type) in self.collections {
            database.create_collection(&name, collection_type)?;
        }

        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aqlite_core::error::ErrorNum;
    use serde_json::json;
    use std::thread;

    #[test]
    fn collection_management() {
        let db = InMemoryDatabase::new();

        let info = db.create_collection("users", CollectionType::Document).unwrap();
        assert_eq!(info.name, "users");
        assert!(
            db.create_collection("users", CollectionType::Edge)
                .unwrap_err()
                .is(ErrorNum::DuplicateName)
        );
        assert!(
            db.create_collection("bad/name", CollectionType::Document)
                .unwrap_err()
                .is(ErrorNum::IllegalName)
        );

        db.create_collection("knows", CollectionType::Edge).unwrap();
        assert_eq!(db.list_collections().unwrap(), ["knows", "users"]);
        assert_eq!(db.collection_info("knows").unwrap().collection_type, CollectionType::Edge);

        db.delete_collection("users").unwrap();
        let err = db.delete_collection("users").unwrap_err();
        assert!(err.is(ErrorNum::CollectionNotFound));
        assert_eq!(err.code, 404);
    }

    #[test]
    fn every_document_operation_requires_the_collection() {
        let db = InMemoryDatabase::new();
        let opts = WriteOptions::new().ignore_errors(true);

        let results = [
            db.collection_info("ghosts").map(drop),
            db.get_document("ghosts", None).map(drop),
            db.insert_document("ghosts", json!({}), opts).map(drop),
            db.replace_document("ghosts", "1", json!({}), opts).map(drop),
            db.remove_document("ghosts", "1", None, opts),
            db.truncate_collection("ghosts"),
            db.documents("ghosts").map(drop),
        ];

        for result in results {
            assert_eq!(result.unwrap_err(), DatabaseError::collection_not_found("ghosts"));
        }
    }

    #[test]
    fn recreated_collection_starts_empty() {
        let db = InMemoryDatabase::new();
        db.create_collection("users", CollectionType::Document).unwrap();
        db.insert_document("users", json!({ "a": 1 }), WriteOptions::new()).unwrap();

        db.delete_collection("users").unwrap();
        db.create_collection("users", CollectionType::Document).unwrap();

        assert!(db.documents("users").unwrap().is_empty());
        let doc = db.insert_document("users", json!({}), WriteOptions::new()).unwrap().unwrap();
        assert_eq!(doc["_key"], "1");
    }

    #[test]
    fn truncate_clears_documents() {
        let db = InMemoryDatabase::new();
        db.create_collection("users", CollectionType::Document).unwrap();
        db.insert_document("users", json!({}), WriteOptions::new()).unwrap();

        db.truncate_collection("users").unwrap();

        assert!(db.documents("users").unwrap().is_empty());
    }

    #[test]
    fn builder_creates_collections() {
        let db = InMemoryDatabase::builder()
            .collection("users", CollectionType::Document)
            .collection("knows", CollectionType::Edge)
            .build()
            .unwrap();

        assert_eq!(db.list_collections().unwrap(), ["knows", "users"]);

        let duplicate = InMemoryDatabase::builder()
            .collection("users", CollectionType::Document)
            .collection("users", CollectionType::Document)
            .build()
            .unwrap_err();
        assert!(duplicate.is(ErrorNum::DuplicateName));

        let illegal = InMemoryDatabase::builder()
            .collection("", CollectionType::Document)
            .build()
            .unwrap_err();
        assert!(illegal.is(ErrorNum::IllegalName));
    }

    #[test]
    fn clones_share_state_across_threads() {
        let db = InMemoryDatabase::new();
        db.create_collection("counter", CollectionType::Document).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        db.insert_document("counter", json!({}), WriteOptions::new()).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(db.documents("counter").unwrap().len(), 100);
    }
}
