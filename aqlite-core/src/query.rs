//! Query construction for the executor.
//!
//! A [`Query`] is an ordered list of [`Operation`]s plus named bind parameters. The
//! executor drives a stream of variable bindings through the operations in order:
//! `For` multiplies the stream, `Filter` thins it, `Insert` writes once per binding
//! and `Return` turns each binding into an output value.
//!
//! # Query Building
//!
//! Queries can be constructed using the fluent builder API:
//!
//! ```ignore
//! use aqlite::query::{Expr, Filter, Query, Source};
//!
//! // FOR u IN users FILTER u.age >= @min RETURN u.name
//! let query = Query::builder()
//!     .for_in("u", Source::collection("users"))
//!     .filter(Filter::gte(Expr::var("u").attr("age"), Expr::param("min")))
//!     .ret(Expr::var("u").attr("name"))
//!     .bind("min", 18)
//!     .build();
//! ```
//!
//! # Expression API
//!
//! [`Expr`] constructors cover literals, variables, bind parameters, attribute access,
//! object and array construction and function calls. The [`Filter`] helper builds
//! comparisons (`eq`, `ne`, `lt`, `lte`, `gt`, `gte`, `in_array`) and logical
//! combinations (`and`, `or`, `not`).
//!
//! # JSON Form
//!
//! Queries are serde types, so an upper layer can ship them as JSON:
//!
//! ```json
//! {
//!   "operations": [
//!     { "type": "for", "variable": "u", "in": { "collection": "users" } },
//!     { "type": "return", "expression": { "variable": "u" } }
//!   ],
//!   "bindVars": {}
//! }
//! ```

use std::{collections::BTreeSet, convert::Infallible};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    document::WriteOptions,
    error::{DatabaseError, DatabaseResult, QueryError},
};

/// Operation tags understood by the executor.
pub const OPERATION_KINDS: &[&str] = &["for", "filter", "insert", "return"];

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Equal to.
    Eq,
    /// Not equal to.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Left value is an element of the right array.
    In,
    /// Left value is not an element of the right array.
    NotIn,
}

/// An expression evaluated against the variables of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// A literal JSON value.
    Value(Value),
    /// A variable bound by an earlier operation.
    Variable(String),
    /// A named bind parameter supplied with the query.
    BindParam(String),
    /// Attribute access; yields `null` on non-objects and missing attributes.
    Attribute {
        of: Box<Expr>,
        name: String,
    },
    /// Object construction.
    Object(Vec<(String, Expr)>),
    /// Array construction.
    Array(Vec<Expr>),
    /// Function call through the function registry.
    Call {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Binary comparison.
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
    /// Logical AND; short-circuits on the first falsy operand.
    And(Vec<Expr>),
    /// Logical OR; short-circuits on the first truthy operand.
    Or(Vec<Expr>),
    /// Logical NOT.
    Not(Box<Expr>),
}

impl Expr {
    /// A literal value.
    pub fn value(value: impl Into<Value>) -> Self {
        Expr::Value(value.into())
    }

    /// A variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    /// A bind parameter reference.
    pub fn param(name: impl Into<String>) -> Self {
        Expr::BindParam(name.into())
    }

    /// A function call.
    pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    /// An object built from `(attribute, expression)` pairs.
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::Object(
            fields
                .into_iter()
                .map(|(name, expr)| (name.into(), expr))
                .collect(),
        )
    }

    /// An array built from expressions.
    pub fn array(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Array(items.into_iter().collect())
    }

    /// Accesses attribute `name` of this expression's value.
    pub fn attr(self, name: impl Into<String>) -> Self {
        Expr::Attribute {
            of: Box::new(self),
            name: name.into(),
        }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

/// Helper struct for constructing comparison expressions.
///
/// # Example
///
/// ```ignore
/// use aqlite::query::{Expr, Filter};
///
/// let expr = Filter::eq(Expr::var("u").attr("name"), Expr::value("john"))
///     .and(Filter::gt(Expr::var("u").attr("age"), Expr::value(18)));
/// ```
pub struct Filter;

impl Filter {
    fn compare(left: Expr, op: CompareOp, right: Expr) -> Expr {
        Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::Eq, right)
    }

    pub fn ne(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::Ne, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::Lt, right)
    }

    pub fn lte(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::Lte, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::Gt, right)
    }

    pub fn gte(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::Gte, right)
    }

    /// Matches when `left` is an element of the array `right`.
    pub fn in_array(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::In, right)
    }

    /// Matches when `left` is not an element of the array `right`.
    pub fn not_in_array(left: Expr, right: Expr) -> Expr {
        Self::compare(left, CompareOp::NotIn, right)
    }

    /// Combines multiple expressions such that all must be truthy.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines multiple expressions such that any must be truthy.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// What a `For` iterates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Every document of a named collection.
    Collection(String),
    /// An expression that must evaluate to an array.
    Expr(Expr),
}

impl Source {
    pub fn collection(name: impl Into<String>) -> Self {
        Source::Collection(name.into())
    }
}

impl From<Expr> for Source {
    fn from(expr: Expr) -> Self {
        Source::Expr(expr)
    }
}

/// One step of a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    /// `FOR variable IN source`: one outgoing frame per source element.
    For {
        variable: String,
        #[serde(rename = "in")]
        source: Source,
    },
    /// `FILTER predicate`: keeps frames whose predicate is truthy.
    Filter { predicate: Expr },
    /// `INSERT document INTO collection`: writes once per frame and binds `NEW`.
    Insert {
        document: Expr,
        collection: String,
        #[serde(default)]
        options: WriteOptions,
    },
    /// `RETURN expression`: terminal projection.
    Return { expression: Expr },
}

impl Operation {
    /// The operation tag, as used in the JSON form.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::For { .. } => "for",
            Operation::Filter { .. } => "filter",
            Operation::Insert { .. } => "insert",
            Operation::Return { .. } => "return",
        }
    }

    /// Whether a query may end with this operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Operation::Return { .. } | Operation::Insert { .. })
    }
}

/// A structured query: operations plus bind parameters.
///
/// Use [`QueryBuilder`] for ergonomic construction or [`Query::from_json`] to decode
/// one supplied by a remote caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Operations, executed in order.
    pub operations: Vec<Operation>,
    /// Bind parameter values, by name without the leading `@`.
    #[serde(default)]
    pub bind_vars: Map<String, Value>,
}

impl Query {
    /// Creates an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Decodes a query from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownOperation`] if an operation tag is not one of
    /// [`OPERATION_KINDS`], or [`QueryError::Serialization`] for any other malformed input.
    pub fn from_json(value: Value) -> Result<Self, QueryError> {
        if let Some(operations) = value.get("operations").and_then(Value::as_array) {
            for operation in operations {
                if let Some(kind) = operation.get("type").and_then(Value::as_str) {
                    if !OPERATION_KINDS.contains(&kind) {
                        return Err(QueryError::UnknownOperation(kind.to_string()));
                    }
                }
            }
        }

        Ok(serde_json::from_value(value)?)
    }

    /// Checks the query before anything runs.
    ///
    /// A query must be non-empty, end in a terminal operation, and have a value for
    /// every bind parameter it references.
    ///
    /// # Errors
    ///
    /// 400/1501 for structural problems, 400/1552 for a missing bind parameter.
    pub fn validate(&self) -> DatabaseResult<()> {
        let Some(last) = self.operations.last() else {
            return Err(DatabaseError::query_parse("query contains no operations"));
        };

        if !last.is_terminal() {
            return Err(DatabaseError::query_parse(format!(
                "query must end in a return or data-modification operation, found '{}'",
                last.kind()
            )));
        }

        for name in self.referenced_bind_params() {
            if !self.bind_vars.contains_key(&name) {
                return Err(DatabaseError::bind_parameter_missing(&name));
            }
        }

        trace!(operations = self.operations.len(), "query validated");

        Ok(())
    }

    /// Names of all bind parameters referenced by the operations.
    pub fn referenced_bind_params(&self) -> BTreeSet<String> {
        let mut collector = BindParamCollector::default();

        for operation in &self.operations {
            let exprs: Vec<&Expr> = match operation {
                Operation::For { source: Source::Expr(expr), .. } => vec![expr],
                Operation::For { .. } => vec![],
                Operation::Filter { predicate } => vec![predicate],
                Operation::Insert { document, .. } => vec![document],
                Operation::Return { expression } => vec![expression],
            };

            for expr in exprs {
                let Ok(()) = collector.visit_expr(expr);
            }
        }

        collector.names
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Appends `FOR variable IN source`.
    pub fn for_in(mut self, variable: impl Into<String>, source: impl Into<Source>) -> Self {
        self.query.operations.push(Operation::For {
            variable: variable.into(),
            source: source.into(),
        });
        self
    }

    /// Appends `FILTER predicate`.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.query
            .operations
            .push(Operation::Filter { predicate });
        self
    }

    /// Appends `INSERT document INTO collection` with default write options.
    pub fn insert(self, document: Expr, collection: impl Into<String>) -> Self {
        self.insert_with(document, collection, WriteOptions::default())
    }

    /// Appends `INSERT document INTO collection OPTIONS options`.
    pub fn insert_with(
        mut self,
        document: Expr,
        collection: impl Into<String>,
        options: WriteOptions,
    ) -> Self {
        self.query.operations.push(Operation::Insert {
            document,
            collection: collection.into(),
            options,
        });
        self
    }

    /// Appends `RETURN expression`.
    pub fn ret(mut self, expression: Expr) -> Self {
        self.query
            .operations
            .push(Operation::Return { expression });
        self
    }

    /// Sets the value of bind parameter `name`.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query
            .bind_vars
            .insert(name.into(), value.into());
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

/// Visitor over [`Expr`] trees.
///
/// [`visit_expr`](Self::visit_expr) dispatches to the per-variant methods.
pub trait ExprVisitor {
    type Output;
    type Error: Into<DatabaseError>;

    fn visit_value(&mut self, value: &Value) -> Result<Self::Output, Self::Error>;
    fn visit_variable(&mut self, name: &str) -> Result<Self::Output, Self::Error>;
    fn visit_bind_param(&mut self, name: &str) -> Result<Self::Output, Self::Error>;
    fn visit_attribute(&mut self, of: &Expr, name: &str) -> Result<Self::Output, Self::Error>;
    fn visit_object(&mut self, fields: &[(String, Expr)]) -> Result<Self::Output, Self::Error>;
    fn visit_array(&mut self, items: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_call(&mut self, name: &str, args: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_compare(
        &mut self,
        left: &Expr,
        op: CompareOp,
        right: &Expr,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::Value(value) => self.visit_value(value),
            Expr::Variable(name) => self.visit_variable(name),
            Expr::BindParam(name) => self.visit_bind_param(name),
            Expr::Attribute { of, name } => self.visit_attribute(of, name),
            Expr::Object(fields) => self.visit_object(fields),
            Expr::Array(items) => self.visit_array(items),
            Expr::Call { name, args } => self.visit_call(name, args),
            Expr::Compare { left, op, right } => self.visit_compare(left, *op, right),
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
        }
    }
}

#[derive(Default)]
struct BindParamCollector {
    names: BTreeSet<String>,
}

impl BindParamCollector {
    fn visit_all<'e>(&mut self, exprs: impl IntoIterator<Item = &'e Expr>) -> Result<(), Infallible> {
        for expr in exprs {
            self.visit_expr(expr)?;
        }
        Ok(())
    }
}

impl ExprVisitor for BindParamCollector {
    type Output = ();
    type Error = Infallible;

    fn visit_value(&mut self, _value: &Value) -> Result<(), Infallible> {
        Ok(())
    }

    fn visit_variable(&mut self, _name: &str) -> Result<(), Infallible> {
        Ok(())
    }

    fn visit_bind_param(&mut self, name: &str) -> Result<(), Infallible> {
        self.names.insert(name.to_string());
        Ok(())
    }

    fn visit_attribute(&mut self, of: &Expr, _name: &str) -> Result<(), Infallible> {
        self.visit_expr(of)
    }

    fn visit_object(&mut self, fields: &[(String, Expr)]) -> Result<(), Infallible> {
        self.visit_all(fields.iter().map(|(_, expr)| expr))
    }

    fn visit_array(&mut self, items: &[Expr]) -> Result<(), Infallible> {
        self.visit_all(items)
    }

    fn visit_call(&mut self, _name: &str, args: &[Expr]) -> Result<(), Infallible> {
        self.visit_all(args)
    }

    fn visit_compare(&mut self, left: &Expr, _op: CompareOp, right: &Expr) -> Result<(), Infallible> {
        self.visit_expr(left)?;
        self.visit_expr(right)
    }

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<(), Infallible> {
        self.visit_all(exprs)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<(), Infallible> {
        self.visit_all(exprs)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<(), Infallible> {
        self.visit_expr(expr)
    }
}
