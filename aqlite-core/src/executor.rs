//! Query execution.
//!
//! [`QueryExecutor`] turns a validated [`Query`] into a lazy [`Cursor`]. Execution
//! starts from a single empty [`ExecutionFrame`] and each operation wraps the frame
//! stream built so far:
//!
//! * `For` evaluates its source for every incoming frame and emits one frame per element
//! * `Filter` drops frames whose predicate is not truthy
//! * `Insert` writes one document per frame and binds the result to `NEW`
//! * `Return` projects each frame into an output value and ends pipeline construction
//!
//! Nothing runs until the cursor is pulled. A query that ends in `Insert` produces no
//! values; its writes happen as the cursor is drained.
//!
//! # Example
//!
//! ```ignore
//! use aqlite::prelude::*;
//!
//! let executor = QueryExecutor::new(&backend, &functions);
//! let names = executor.execute_to_array(
//!     Query::builder()
//!         .for_in("u", Source::collection("users"))
//!         .ret(Expr::var("u").attr("name"))
//!         .build(),
//! )?;
//! ```

use std::{fmt, iter, sync::Arc};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    backend::DatabaseBackend,
    error::{DatabaseError, DatabaseResult},
    evaluator::{FrameEvaluator, is_truthy},
    frame::ExecutionFrame,
    functions::FunctionRegistry,
    query::{Expr, Operation, Query, Source},
};

/// Variable bound by `Insert` to the document it wrote.
pub const NEW_VARIABLE: &str = "NEW";

type FrameStream<'a> = Box<dyn Iterator<Item = DatabaseResult<ExecutionFrame>> + 'a>;
type ValueStream<'a> = Box<dyn Iterator<Item = DatabaseResult<Value>> + 'a>;

/// Everything an operation needs to evaluate expressions.
#[derive(Clone)]
struct Scope<'a> {
    database: &'a dyn DatabaseBackend,
    functions: &'a FunctionRegistry,
    bind_vars: Arc<Map<String, Value>>,
}

impl<'a> Scope<'a> {
    fn evaluate(&self, frame: &ExecutionFrame, expr: &Expr) -> DatabaseResult<Value> {
        FrameEvaluator::new(frame, &self.bind_vars, self.database, self.functions).evaluate(expr)
    }

    fn source_items(&self, frame: &ExecutionFrame, source: &Source) -> DatabaseResult<Vec<Value>> {
        match source {
            Source::Collection(name) => self.database.documents(name),
            Source::Expr(expr) => match self.evaluate(frame, expr)? {
                Value::Array(items) => Ok(items),
                _ => Err(DatabaseError::array_expected()),
            },
        }
    }
}

/// Runs queries against a backend and a function registry.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor<'a> {
    database: &'a dyn DatabaseBackend,
    functions: &'a FunctionRegistry,
}

impl<'a> QueryExecutor<'a> {
    /// Creates an executor.
    ///
    /// # Arguments
    ///
    /// * `database` - Backend consulted by `For`, `Insert` and storage functions
    /// * `functions` - Registry used for every function call
    pub fn new(database: &'a dyn DatabaseBackend, functions: &'a FunctionRegistry) -> Self {
        Self { database, functions }
    }

    /// Validates `query` and returns a lazy cursor over its results.
    ///
    /// # Errors
    ///
    /// Returns the validation error if the query is empty, does not end in a terminal
    /// operation, or references a bind parameter it does not supply. Nothing has been
    /// executed in that case. Errors raised while running surface through the cursor.
    pub fn execute(&self, query: Query) -> DatabaseResult<Cursor<'a>> {
        query.validate()?;

        let scope = Scope {
            database: self.database,
            functions: self.functions,
            bind_vars: Arc::new(query.bind_vars),
        };

        let mut stream: FrameStream<'a> = Box::new(iter::once(DatabaseResult::Ok(ExecutionFrame::new())));

        for operation in query.operations {
            debug!(operation = operation.kind(), "adding operation to pipeline");

            stream = match operation {
                Operation::For { variable, source } => Self::for_each(stream, scope.clone(), variable, source),
                Operation::Filter { predicate } => Self::filter(stream, scope.clone(), predicate),
                Operation::Insert { document, collection, options } => {
                    let scope = scope.clone();
                    Box::new(stream.map(move |frame| {
                        let frame = frame?;
                        let document = scope.evaluate(&frame, &document)?;
                        let inserted = scope
                            .database
                            .insert_document(&collection, document, options)?;

                        Ok(frame.with_variable(NEW_VARIABLE, inserted.unwrap_or(Value::Null)))
                    }))
                }
                Operation::Return { expression } => {
                    let scope = scope.clone();
                    return Ok(Cursor::new(Box::new(stream.map(move |frame| {
                        frame.and_then(|frame| scope.evaluate(&frame, &expression))
                    }))));
                }
            };
        }

        // No projection: drain for side effects and surface errors only.
        Ok(Cursor::new(Box::new(stream.filter_map(|frame| frame.err().map(Err::<Value, _>)))))
    }

    /// Executes `query` and collects every result.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by validation or execution.
    pub fn execute_to_array(&self, query: Query) -> DatabaseResult<Vec<Value>> {
        self.execute(query)?.collect()
    }

    fn for_each(stream: FrameStream<'a>, scope: Scope<'a>, variable: String, source: Source) -> FrameStream<'a> {
        Box::new(stream.flat_map(move |frame| -> FrameStream<'a> {
            let (frame, items) = match frame.and_then(|frame| {
                let items = scope.source_items(&frame, &source)?;
                Ok((frame, items))
            }) {
                Ok(bound) => bound,
                Err(err) => return Box::new(iter::once(Err(err))),
            };

            let variable = variable.clone();
            Box::new(
                items
                    .into_iter()
                    .map(move |item| DatabaseResult::Ok(frame.with_variable(variable.as_str(), item))),
            )
        }))
    }

    fn filter(stream: FrameStream<'a>, scope: Scope<'a>, predicate: Expr) -> FrameStream<'a> {
        Box::new(stream.filter_map(move |frame| {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => return Some(Err(err)),
            };

            match scope.evaluate(&frame, &predicate) {
                Ok(value) => is_truthy(&value).then_some(Ok(frame)),
                Err(err) => Some(Err(err)),
            }
        }))
    }
}

/// Lazy sequence of query results.
///
/// Each call to `next` pulls just enough frames through the pipeline to produce one
/// value. After the first error the cursor is exhausted.
pub struct Cursor<'a> {
    inner: ValueStream<'a>,
    failed: bool,
}

impl<'a> Cursor<'a> {
    fn new(inner: ValueStream<'a>) -> Self {
        Self { inner, failed: false }
    }
}

impl Iterator for Cursor<'_> {
    type Item = DatabaseResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let item = self.inner.next();
        if let Some(Err(err)) = &item {
            debug!(error_num = err.error_num, "query execution failed");
            self.failed = true;
        }
        item
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::WriteOptions,
        error::ErrorNum,
        query::Filter,
        testing::TestBackend,
    };
    use serde_json::json;

    fn users() -> TestBackend {
        TestBackend::new().with_collection(
            "users",
            [
                json!({ "name": "john", "age": 30 }),
                json!({ "name": "jane", "age": 17 }),
                json!({ "name": "joe", "age": 45 }),
            ],
        )
    }

    fn log_backend() -> TestBackend {
        TestBackend::new().with_collection("log", Vec::<Value>::new())
    }

    fn run(backend: &TestBackend, query: Query) -> DatabaseResult<Vec<Value>> {
        let functions = FunctionRegistry::new();
        QueryExecutor::new(backend, &functions).execute_to_array(query)
    }

    fn sorted(mut values: Vec<Value>) -> Vec<Value> {
        values.sort_by(crate::evaluator::compare_values);
        values
    }

    #[test]
    fn for_over_collection_returns_every_document() {
        let backend = users();
        let result = run(
            &backend,
            Query::builder()
                .for_in("u", Source::collection("users"))
                .ret(Expr::var("u"))
                .build(),
        )
        .unwrap();

        assert_eq!(result, backend.documents("users").unwrap());
    }

    #[test]
    fn nested_for_multiplies_frames() {
        let result = run(
            &TestBackend::new(),
            Query::builder()
                .for_in("a", Expr::value(json!([1, 2, 3])))
                .for_in("b", Expr::value(json!(["x", "y"])))
                .ret(Expr::array([Expr::var("a"), Expr::var("b")]))
                .build(),
        )
        .unwrap();

        assert_eq!(result.len(), 6);
        assert_eq!(result[0], json!([1, "x"]));
        assert_eq!(result[5], json!([3, "y"]));
    }

    #[test]
    fn inner_for_sees_outer_variable() {
        let result = run(
            &TestBackend::new(),
            Query::builder()
                .for_in("row", Expr::value(json!([[1, 2], [3]])))
                .for_in("cell", Expr::var("row"))
                .ret(Expr::var("cell"))
                .build(),
        )
        .unwrap();

        assert_eq!(result, [json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn filter_keeps_truthy_frames() {
        let result = run(
            &users(),
            Query::builder()
                .for_in("u", Source::collection("users"))
                .filter(Filter::gte(Expr::var("u").attr("age"), Expr::param("min")))
                .ret(Expr::var("u").attr("name"))
                .bind("min", 18)
                .build(),
        )
        .unwrap();

        assert_eq!(sorted(result), [json!("joe"), json!("john")]);
    }

    #[test]
    fn insert_runs_once_per_frame_and_binds_new() {
        let backend = log_backend();
        let result = run(
            &backend,
            Query::builder()
                .for_in("n", Expr::value(json!([1, 2, 3])))
                .insert(Expr::object([("n", Expr::var("n"))]), "log")
                .ret(Expr::var(NEW_VARIABLE).attr("_id"))
                .build(),
        )
        .unwrap();

        assert_eq!(result, [json!("log/1"), json!("log/2"), json!("log/3")]);
        assert_eq!(backend.documents("log").unwrap().len(), 3);
    }

    #[test]
    fn insert_without_return_writes_when_drained() {
        let backend = log_backend();
        let functions = FunctionRegistry::new();
        let executor = QueryExecutor::new(&backend, &functions);

        let mut cursor = executor
            .execute(
                Query::builder()
                    .for_in("n", Expr::value(json!([1, 2])))
                    .insert(Expr::object([("n", Expr::var("n"))]), "log")
                    .build(),
            )
            .unwrap();

        assert!(backend.documents("log").unwrap().is_empty());
        assert!(cursor.next().is_none());
        assert_eq!(backend.documents("log").unwrap().len(), 2);
    }

    #[test]
    fn cursor_is_lazy() {
        let backend = log_backend();
        let functions = FunctionRegistry::new();
        let executor = QueryExecutor::new(&backend, &functions);

        let mut cursor = executor
            .execute(
                Query::builder()
                    .for_in("n", Expr::value(json!([1, 2, 3])))
                    .insert(Expr::object([("n", Expr::var("n"))]), "log")
                    .ret(Expr::var("n"))
                    .build(),
            )
            .unwrap();

        assert_eq!(cursor.next().unwrap().unwrap(), json!(1));
        assert_eq!(backend.documents("log").unwrap().len(), 1);
    }

    #[test]
    fn invalid_query_has_no_side_effects() {
        let backend = log_backend();
        let err = run(
            &backend,
            Query::builder()
                .insert(Expr::object([("a", Expr::param("missing"))]), "log")
                .insert_with(Expr::value(json!({})), "log", WriteOptions::new())
                .for_in("x", Expr::value(json!([])))
                .build(),
        )
        .unwrap_err();

        assert!(err.is(ErrorNum::QueryParse));
        assert!(backend.documents("log").unwrap().is_empty());
    }

    #[test]
    fn operations_after_return_are_not_run() {
        let backend = log_backend();
        let result = run(
            &backend,
            Query::builder()
                .ret(Expr::value(1))
                .insert(Expr::object([("a", Expr::value(1))]), "log")
                .build(),
        )
        .unwrap();

        assert_eq!(result, [json!(1)]);
        assert!(backend.documents("log").unwrap().is_empty());
    }

    #[test]
    fn missing_collection_propagates_unchanged() {
        let err = run(
            &TestBackend::new(),
            Query::builder()
                .for_in("u", Source::collection("ghosts"))
                .ret(Expr::var("u"))
                .build(),
        )
        .unwrap_err();

        assert_eq!(err, DatabaseError::collection_not_found("ghosts"));
    }

    #[test]
    fn non_array_source_is_rejected() {
        let err = run(
            &TestBackend::new(),
            Query::builder()
                .for_in("x", Expr::value("scalar"))
                .ret(Expr::var("x"))
                .build(),
        )
        .unwrap_err();

        assert!(err.is(ErrorNum::ArrayExpected));
    }

    #[test]
    fn cursor_stops_after_first_error() {
        let functions = FunctionRegistry::new();
        let backend = TestBackend::new();
        let executor = QueryExecutor::new(&backend, &functions);

        let mut cursor = executor
            .execute(
                Query::builder()
                    .for_in("x", Expr::value(json!([1, 2])))
                    .ret(Expr::call("NOPE", [Expr::var("x")]))
                    .build(),
            )
            .unwrap();

        assert!(cursor.next().unwrap().unwrap_err().is(ErrorNum::FunctionNameUnknown));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn query_without_for_returns_once() {
        let result = run(
            &TestBackend::new(),
            Query::builder()
                .ret(Expr::call("CONCAT", [Expr::value("a"), Expr::param("b")]))
                .bind("b", "c")
                .build(),
        )
        .unwrap();

        assert_eq!(result, [json!("ac")]);
    }
}
