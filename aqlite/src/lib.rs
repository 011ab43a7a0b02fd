//! An in-memory, ArangoDB-style document database with a minimal AQL executor.
//!
//! This crate is the entry point for users of aqlite. It re-exports the core types
//! from `aqlite-core` and the in-memory backend from `aqlite-memory`.
//!
//! # Features
//!
//! - **Collections of JSON documents** - Keys, revisions and `_id` handles with ArangoDB semantics
//! - **Edge collections** - `_from` / `_to` validation on every write
//! - **Optimistic concurrency** - `checkRevs` on replace and remove
//! - **Structured queries** - `FOR`, `FILTER`, `INSERT` and `RETURN` over lazy frame streams
//! - **Structured errors** - Every failure carries an HTTP status and an ArangoDB error number
//!
//! # Quick Start
//!
//! ```ignore
//! use aqlite::{prelude::*, memory::InMemoryDatabase};
//! use serde_json::json;
//!
//! fn main() -> DatabaseResult<()> {
//!     let db = Database::new(InMemoryDatabase::new());
//!
//!     let users = db.create_collection("users", CollectionType::Document)?;
//!     users.insert(json!({ "name": "john", "age": 30 }), WriteOptions::new())?;
//!     users.insert(json!({ "name": "jane", "age": 17 }), WriteOptions::new())?;
//!
//!     // FOR u IN users FILTER u.age >= @min RETURN u.name
//!     let adults = db.query(
//!         Query::builder()
//!             .for_in("u", Source::collection("users"))
//!             .filter(Filter::gte(Expr::var("u").attr("age"), Expr::param("min")))
//!             .ret(Expr::var("u").attr("name"))
//!             .bind("min", 18)
//!             .build(),
//!     )?;
//!
//!     assert_eq!(adults, [json!("john")]);
//!     Ok(())
//! }
//! ```
//!
//! # Error Codes
//!
//! Callers match on [`DatabaseError::error_num`](error::DatabaseError) rather than on
//! messages. A common pattern is treating 1203 (collection not found) as an empty result:
//!
//! ```ignore
//! let rows = match db.query(query) {
//!     Ok(rows) => rows,
//!     Err(err) if err.is(ErrorNum::CollectionNotFound) => Vec::new(),
//!     Err(err) => return Err(err),
//! };
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development, tests and embedding

pub mod prelude;

pub use aqlite_core::{
    backend, collection, document, document_id, error, evaluator, executor, frame, functions, query,
    store,
};

// Re-export serde_json for building documents
pub use serde_json;

/// In-memory storage backend implementations.
pub mod memory {
    pub use aqlite_memory::{InMemoryDatabase, InMemoryDatabaseBuilder, MemoryCollection};
}
