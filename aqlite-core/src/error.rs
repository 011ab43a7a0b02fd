//! Error types and result types for database and query operations.
//!
//! Every failure raised by a collection, a database or the query engine is a
//! [`DatabaseError`]: an HTTP-like status, a numeric error code and a message.
//! Callers should branch on [`DatabaseError::error_num`] alone; the numbers
//! follow ArangoDB so that code written against the in-memory backend behaves
//! the same against a networked one.
//!
//! [`QueryError`] is only produced while decoding a query from JSON.

use std::convert::Infallible;

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Numeric error codes raised by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorNum {
    /// A revision check failed during a write.
    Conflict = 1200,
    /// The requested document does not exist.
    DocumentNotFound = 1202,
    /// The requested collection does not exist.
    CollectionNotFound = 1203,
    /// A collection with the same name already exists.
    DuplicateName = 1207,
    /// The collection name contains illegal characters or is too long.
    IllegalName = 1208,
    /// A document with the same key already exists.
    UniqueConstraintViolated = 1210,
    /// The document key is missing, malformed or too long.
    IllegalDocumentKey = 1221,
    /// A document is not a JSON object.
    DocumentTypeInvalid = 1227,
    /// An edge document lacks valid `_from` / `_to` attributes.
    InvalidEdgeAttribute = 1233,
    /// The query is structurally invalid.
    QueryParse = 1501,
    /// An expression references a variable that is not bound.
    VariableNameUnknown = 1512,
    /// A function was called with the wrong number of arguments.
    FunctionArgumentNumberMismatch = 1540,
    /// A function was called with an argument of the wrong type.
    FunctionArgumentTypeMismatch = 1541,
    /// A bind parameter is referenced but no value was supplied.
    BindParameterMissing = 1552,
    /// An array was expected but something else was found.
    ArrayExpected = 1563,
    /// The query references a function that is not registered.
    FunctionNameUnknown = 1582,
}

impl ErrorNum {
    /// HTTP status associated with the error code.
    pub fn status(self) -> u16 {
        match self {
            ErrorNum::DocumentNotFound
            | ErrorNum::CollectionNotFound
            | ErrorNum::FunctionNameUnknown => 404,
            ErrorNum::Conflict
            | ErrorNum::DuplicateName
            | ErrorNum::UniqueConstraintViolated => 409,
            _ => 400,
        }
    }

    /// Default message associated with the error code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorNum::Conflict => "conflict",
            ErrorNum::DocumentNotFound => "document not found",
            ErrorNum::CollectionNotFound => "collection or view not found",
            ErrorNum::DuplicateName => "duplicate name",
            ErrorNum::IllegalName => "illegal name",
            ErrorNum::UniqueConstraintViolated => "unique constraint violated",
            ErrorNum::IllegalDocumentKey => "illegal document key",
            ErrorNum::DocumentTypeInvalid => "invalid document type",
            ErrorNum::InvalidEdgeAttribute => "edge attribute missing or invalid",
            ErrorNum::QueryParse => "query parse error",
            ErrorNum::VariableNameUnknown => "unknown variable",
            ErrorNum::FunctionArgumentNumberMismatch => "invalid number of arguments for function",
            ErrorNum::FunctionArgumentTypeMismatch => "invalid argument type in call to function",
            ErrorNum::BindParameterMissing => "no value specified for declared bind parameter",
            ErrorNum::ArrayExpected => "array expected",
            ErrorNum::FunctionNameUnknown => "usage of unknown function",
        }
    }
}

/// The structured error raised by every database and query operation.
///
/// Serializes as `{"code": .., "errorNum": .., "errorMessage": ..}` so that an
/// RPC layer can forward it to remote callers untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{error_message} (status {code}, error {error_num})")]
#[serde(rename_all = "camelCase")]
pub struct DatabaseError {
    /// HTTP-like status code.
    pub code: u16,
    /// Numeric error code, see [`ErrorNum`].
    pub error_num: u32,
    /// Human-readable message.
    pub error_message: String,
}

impl DatabaseError {
    /// Creates an error with the default message for `num`.
    pub fn new(num: ErrorNum) -> Self {
        Self::with_message(num, num.message())
    }

    /// Creates an error for `num` with a custom message.
    pub fn with_message(num: ErrorNum, message: impl Into<String>) -> Self {
        Self {
            code: num.status(),
            error_num: num as u32,
            error_message: message.into(),
        }
    }

    /// Returns `true` if this error carries the given code.
    pub fn is(&self, num: ErrorNum) -> bool {
        self.error_num == num as u32
    }

    pub fn illegal_name(name: &str) -> Self {
        Self::with_message(ErrorNum::IllegalName, format!("illegal name: '{name}'"))
    }

    pub fn illegal_key(key: &str) -> Self {
        Self::with_message(ErrorNum::IllegalDocumentKey, format!("illegal document key: '{key}'"))
    }

    pub fn duplicate_name(name: &str) -> Self {
        Self::with_message(ErrorNum::DuplicateName, format!("duplicate name: '{name}'"))
    }

    pub fn collection_not_found(name: &str) -> Self {
        Self::with_message(
            ErrorNum::CollectionNotFound,
            format!("collection or view not found: {name}"),
        )
    }

    pub fn document_not_found() -> Self {
        Self::new(ErrorNum::DocumentNotFound)
    }

    pub fn unique_constraint_violated(key: &str) -> Self {
        Self::with_message(
            ErrorNum::UniqueConstraintViolated,
            format!("unique constraint violated - conflicting key: {key}"),
        )
    }

    pub fn conflict() -> Self {
        Self::new(ErrorNum::Conflict)
    }

    pub fn invalid_document_type() -> Self {
        Self::new(ErrorNum::DocumentTypeInvalid)
    }

    pub fn invalid_edge_attribute() -> Self {
        Self::new(ErrorNum::InvalidEdgeAttribute)
    }

    pub fn query_parse(reason: impl AsRef<str>) -> Self {
        Self::with_message(
            ErrorNum::QueryParse,
            format!("query parse error: {}", reason.as_ref()),
        )
    }

    pub fn unknown_variable(name: &str) -> Self {
        Self::with_message(
            ErrorNum::VariableNameUnknown,
            format!("unknown variable '{name}'"),
        )
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::with_message(
            ErrorNum::FunctionNameUnknown,
            format!("usage of unknown function '{name}()'"),
        )
    }

    pub fn argument_count(name: &str, min: usize, max: usize) -> Self {
        Self::with_message(
            ErrorNum::FunctionArgumentNumberMismatch,
            format!(
                "invalid number of arguments for function '{name}()', expected number of arguments: minimum: {min}, maximum: {max}"
            ),
        )
    }

    pub fn argument_type(name: &str) -> Self {
        Self::with_message(
            ErrorNum::FunctionArgumentTypeMismatch,
            format!("invalid argument type in call to function '{name}()'"),
        )
    }

    pub fn bind_parameter_missing(name: &str) -> Self {
        Self::with_message(
            ErrorNum::BindParameterMissing,
            format!("no value specified for declared bind parameter '{name}'"),
        )
    }

    pub fn array_expected() -> Self {
        Self::new(ErrorNum::ArrayExpected)
    }
}

impl From<Infallible> for DatabaseError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// A specialized `Result` type for database and query operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors raised while turning external input into a [`Query`](crate::query::Query).
#[derive(Error, Debug)]
pub enum QueryError {
    /// The operation list names an operation kind the engine does not implement.
    #[error("Unknown operation kind: {0}")]
    UnknownOperation(String),
    /// The query JSON is malformed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A structured database error.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<SerdeJsonError> for QueryError {
    fn from(err: SerdeJsonError) -> Self {
        QueryError::Serialization(err.to_string())
    }
}
