//! Main database interface.
//!
//! [`Database`] pairs a storage backend with the function registry used by queries. It
//! is the entry point for collection management, collection handles and query execution.
//!
//! # Example
//!
//! ```ignore
//! use aqlite::{prelude::*, memory::InMemoryDatabase};
//! use serde_json::json;
//!
//! let db = Database::new(InMemoryDatabase::new());
//! db.create_collection("users", CollectionType::Document)?;
//! db.collection("users")?.insert(json!({ "name": "john" }), WriteOptions::new())?;
//!
//! let names = db.query(
//!     Query::builder()
//!         .for_in("u", Source::collection("users"))
//!         .ret(Expr::var("u").attr("name"))
//!         .build(),
//! )?;
//! ```

use serde_json::Value;
use tracing::debug;

use crate::{
    backend::DatabaseBackend,
    collection::Collection,
    document::CollectionType,
    error::{DatabaseResult, ErrorNum},
    executor::{Cursor, QueryExecutor},
    functions::FunctionRegistry,
    query::Query,
};

/// A database bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct Database<B: DatabaseBackend> {
    backend: B,
    functions: FunctionRegistry,
}

impl<B: DatabaseBackend> Database<B> {
    /// Creates a database over `backend` with the built-in functions.
    pub fn new(backend: B) -> Self {
        Self::with_functions(backend, FunctionRegistry::new())
    }

    /// Creates a database over `backend` with a custom function registry.
    pub fn with_functions(backend: B, functions: FunctionRegistry) -> Self {
        Self { backend, functions }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Returns the function registry for registering additional functions.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Gets a handle to an existing collection.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the collection
    ///
    /// # Errors
    ///
    /// Returns 404/1203 if the collection does not exist.
    pub fn collection(&self, name: &str) -> DatabaseResult<Collection<'_, B>> {
        let info = self.backend.collection_info(name)?;
        Ok(Collection::new(info, &self.backend))
    }

    /// Creates a new collection and returns a handle to it.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the collection to create
    /// * `collection_type` - Whether the collection holds documents or edges
    ///
    /// # Errors
    ///
    /// Returns 400/1208 if the name is illegal or 409/1207 if it is already taken.
    pub fn create_collection(&self, name: &str, collection_type: CollectionType) -> DatabaseResult<Collection<'_, B>> {
        let info = self
            .backend
            .create_collection(name, collection_type)?;
        Ok(Collection::new(info, &self.backend))
    }

    /// Deletes a collection and every document in it.
    ///
    /// # Errors
    ///
    /// Returns 404/1203 if the collection does not exist.
    pub fn delete_collection(&self, name: &str) -> DatabaseResult<()> {
        self.backend.delete_collection(name)
    }

    /// Lists all collections.
    ///
    /// # Returns
    ///
    /// A vector of collection names.
    pub fn list_collections(&self) -> DatabaseResult<Vec<String>> {
        self.backend.list_collections()
    }

    /// Whether a collection named `name` exists.
    ///
    /// # Errors
    ///
    /// Only errors other than 404/1203 are returned.
    pub fn has_collection(&self, name: &str) -> DatabaseResult<bool> {
        match self.backend.collection_info(name) {
            Ok(_) => Ok(true),
            Err(err) if err.is(ErrorNum::CollectionNotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Returns an executor bound to this database.
    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.backend, &self.functions)
    }

    /// Validates `query` and returns a lazy cursor over its results.
    ///
    /// # Errors
    ///
    /// Returns the validation error; execution errors surface through the cursor.
    pub fn cursor(&self, query: Query) -> DatabaseResult<Cursor<'_>> {
        self.executor().execute(query)
    }

    /// Executes `query` and collects every result.
    ///
    /// # Errors
    ///
    /// Returns the first validation or execution error.
    pub fn query(&self, query: Query) -> DatabaseResult<Vec<Value>> {
        debug!(operations = query.operations.len(), "executing query");
        self.executor().execute_to_array(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::WriteOptions,
        error::DatabaseError,
        query::{Expr, Source},
        testing::TestBackend,
    };
    use serde_json::json;

    #[test]
    fn collection_lookup() {
        let db = Database::new(TestBackend::new());
        db.create_collection("users", CollectionType::Document).unwrap();

        assert_eq!(db.collection("users").unwrap().name(), "users");
        assert!(db.has_collection("users").unwrap());
        assert!(!db.has_collection("ghosts").unwrap());
        assert_eq!(
            db.collection("ghosts").unwrap_err(),
            DatabaseError::collection_not_found("ghosts")
        );
    }

    #[test]
    fn deleted_collection_is_observed_by_existing_handle() {
        let db = Database::new(TestBackend::new());
        let users = db.create_collection("users", CollectionType::Document).unwrap();

        db.delete_collection("users").unwrap();

        assert!(users.all().unwrap_err().is(ErrorNum::CollectionNotFound));
        assert!(db.list_collections().unwrap().is_empty());
    }

    #[test]
    fn custom_functions_are_used_by_queries() {
        let mut db = Database::new(TestBackend::new());
        db.functions_mut()
            .register("DOUBLE", |_, args| Ok(json!(args[0].as_i64().unwrap_or(0) * 2)));

        let result = db
            .query(
                Query::builder()
                    .for_in("n", Expr::value(json!([1, 2])))
                    .ret(Expr::call("double", [Expr::var("n")]))
                    .build(),
            )
            .unwrap();

        assert_eq!(result, [json!(2), json!(4)]);
    }

    #[test]
    fn functions_see_collections_created_later() {
        let db = Database::new(TestBackend::new());
        let query = || {
            Query::builder()
                .ret(Expr::call("COLLECTION", [Expr::value("late")]))
                .build()
        };

        assert!(db.query(query()).unwrap_err().is(ErrorNum::CollectionNotFound));

        db.create_collection("late", CollectionType::Document)
            .unwrap()
            .insert(json!({ "a": 1 }), WriteOptions::new())
            .unwrap();

        let result = db.query(query()).unwrap();
        assert_eq!(result[0].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn cursor_yields_lazily() {
        let db = Database::new(TestBackend::new());
        let mut cursor = db
            .cursor(
                Query::builder()
                    .for_in("n", Source::from(Expr::value(json!([1, 2, 3]))))
                    .ret(Expr::var("n"))
                    .build(),
            )
            .unwrap();

        assert_eq!(cursor.next().unwrap().unwrap(), json!(1));
        assert_eq!(cursor.count(), 2);
    }
}
