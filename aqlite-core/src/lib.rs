//! Core types and query engine for an ArangoDB-style document database.
//!
//! This crate is the backend-agnostic half of aqlite and provides:
//!
//! - **Document ids** ([`document_id`]) - Validated `collection/key` pairs
//! - **Documents** ([`document`]) - Pseudo-field handling, revisions and write options
//! - **Storage backend abstraction** ([`backend`]) - The contract every storage engine implements
//! - **Collections interface** ([`collection`]) - Named handles for document CRUD
//! - **Database** ([`store`]) - Collection management and query entry points
//! - **Queries** ([`query`]) - Operations, expressions and a fluent builder
//! - **Execution** ([`executor`], [`frame`], [`evaluator`], [`functions`]) - Lazy frame streams,
//!   expression evaluation and the function registry
//! - **Error handling** ([`error`]) - The structured `(status, errorNum, message)` error
//!
//! # Example
//!
//! ```ignore
//! use aqlite_core::{query::{Expr, Query, Source}, store::Database};
//!
//! let db = Database::new(backend);
//! let everyone = db.query(
//!     Query::builder()
//!         .for_in("u", Source::collection("users"))
//!         .ret(Expr::var("u"))
//!         .build(),
//! )?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as aqlite_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod document_id;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod frame;
pub mod functions;
pub mod query;
pub mod store;

#[cfg(test)]
mod testing;
