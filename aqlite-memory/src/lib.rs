//! In-memory storage backend for aqlite.
//!
//! This crate provides a thread-safe, in-memory implementation of the `DatabaseBackend`
//! trait. It is meant for tests and for embedding, where a real database process is
//! not available.
//!
//! # Features
//!
//! - **Thread-safe access** - All clones share one map behind a `parking_lot` read-write lock
//! - **ArangoDB-compatible writes** - Generated keys, revisions, `overwrite`, `ignoreErrors`
//!   and `checkRevs`
//! - **Edge collections** - `_from` / `_to` are validated on every write
//!
//! # Quick Start
//!
//! ```ignore
//! use aqlite::{prelude::*, memory::InMemoryDatabase};
//! use serde_json::json;
//!
//! let db = Database::new(
//!     InMemoryDatabase::builder()
//!         .collection("users", CollectionType::Document)
//!         .build()?,
//! );
//!
//! let john = db
//!     .collection("users")?
//!     .insert(json!({ "name": "john" }), WriteOptions::new())?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as aqlite_memory;

pub mod collection;
pub mod store;

pub use collection::MemoryCollection;
pub use store::{InMemoryDatabase, InMemoryDatabaseBuilder};
