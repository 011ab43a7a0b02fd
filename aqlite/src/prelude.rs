//! Convenient re-exports of commonly used types from aqlite.
//!
//! ```ignore
//! use aqlite::prelude::*;
//! ```
//!
//! This provides access to:
//! - The database front object and collection handles
//! - Backend traits and builders
//! - Query construction and execution
//! - Document ids, write options and error types

pub use aqlite_core::{
    backend::{CollectionInfo, DatabaseBackend, DatabaseBackendBuilder},
    collection::Collection,
    document::{CollectionType, WriteOptions},
    document_id::DocumentId,
    error::{DatabaseError, DatabaseResult, ErrorNum, QueryError},
    executor::{Cursor, QueryExecutor},
    frame::ExecutionFrame,
    functions::FunctionRegistry,
    query::{CompareOp, Expr, ExprVisitor, Filter, Operation, Query, QueryBuilder, Source},
    store::Database,
};
