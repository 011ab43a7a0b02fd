//! Expression evaluation against an execution frame.
//!
//! This module provides the value ordering and truthiness rules used by comparisons
//! and filters, and [`FrameEvaluator`], which computes the value of an [`Expr`] given
//! one frame's variables, the query's bind parameters and the function registry.

use std::{cmp::Ordering, collections::BTreeMap};

use serde_json::{Map, Value};

use crate::{
    backend::DatabaseBackend,
    error::{DatabaseError, DatabaseResult},
    frame::ExecutionFrame,
    functions::FunctionRegistry,
    query::{CompareOp, Expr, ExprVisitor},
};

/// Comparable view of a JSON value.
///
/// Values of different types order by type: null < bool < number < string < array < object.
/// All numbers are normalized to f64, so `1` equals `1.0`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Numeric value (all integers and floats normalized to f64)
    Number(f64),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Object with attributes in name order
    Object(BTreeMap<&'a str, Comparable<'a>>),
}

impl<'a> Comparable<'a> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Object(_) => 5,
        }
    }
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => Comparable::Number(value.as_f64().unwrap_or_default()),
            Value::String(value) => Comparable::String(value),
            Value::Array(items) => Comparable::Array(
                items
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Value::Object(object) => Comparable::Object(
                object
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<BTreeMap<_, _>>()
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<'a> Eq for Comparable<'a> {}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> Ord for Comparable<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a.cmp(b),
            (Comparable::Object(a), Comparable::Object(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Orders two JSON values.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    Comparable::from(left).cmp(&Comparable::from(right))
}

/// Truthiness: `null`, `false`, `0` and `""` are falsy, everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(value) => *value,
        Value::Number(value) => value.as_f64().is_some_and(|n| n != 0.0),
        Value::String(value) => !value.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Evaluates expressions in the context of one frame.
pub struct FrameEvaluator<'e> {
    frame: &'e ExecutionFrame,
    bind_vars: &'e Map<String, Value>,
    database: &'e dyn DatabaseBackend,
    functions: &'e FunctionRegistry,
}

impl<'e> FrameEvaluator<'e> {
    pub fn new(
        frame: &'e ExecutionFrame,
        bind_vars: &'e Map<String, Value>,
        database: &'e dyn DatabaseBackend,
        functions: &'e FunctionRegistry,
    ) -> Self {
        Self { frame, bind_vars, database, functions }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DatabaseResult<Value> {
        self.visit_expr(expr)
    }

    fn evaluate_all(&mut self, exprs: &[Expr]) -> DatabaseResult<Vec<Value>> {
        exprs
            .iter()
            .map(|expr| self.visit_expr(expr))
            .collect()
    }
}

impl<'e> ExprVisitor for FrameEvaluator<'e> {
    type Output = Value;
    type Error = DatabaseError;

    fn visit_value(&mut self, value: &Value) -> DatabaseResult<Value> {
        Ok(value.clone())
    }

    fn visit_variable(&mut self, name: &str) -> DatabaseResult<Value> {
        self.frame
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::unknown_variable(name))
    }

    fn visit_bind_param(&mut self, name: &str) -> DatabaseResult<Value> {
        // Parameter values are data only and are never interpreted as expressions.
        self.bind_vars
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::bind_parameter_missing(name))
    }

    fn visit_attribute(&mut self, of: &Expr, name: &str) -> DatabaseResult<Value> {
        Ok(match self.visit_expr(of)? {
            Value::Object(mut object) => object.remove(name).unwrap_or(Value::Null),
            _ => Value::Null,
        })
    }

    fn visit_object(&mut self, fields: &[(String, Expr)]) -> DatabaseResult<Value> {
        let mut object = Map::with_capacity(fields.len());

        for (name, expr) in fields {
            let value = self.visit_expr(expr)?;
            object.insert(name.clone(), value);
        }

        Ok(Value::Object(object))
    }

    fn visit_array(&mut self, items: &[Expr]) -> DatabaseResult<Value> {
        Ok(Value::Array(self.evaluate_all(items)?))
    }

    fn visit_call(&mut self, name: &str, args: &[Expr]) -> DatabaseResult<Value> {
        let args = self.evaluate_all(args)?;

        self.functions
            .evaluate(self.database, name, &args)
    }

    fn visit_compare(&mut self, left: &Expr, op: CompareOp, right: &Expr) -> DatabaseResult<Value> {
        let left = self.visit_expr(left)?;
        let right = self.visit_expr(right)?;

        let contains = |haystack: &Value| match haystack {
            Value::Array(items) => items
                .iter()
                .any(|item| compare_values(item, &left) == Ordering::Equal),
            _ => false,
        };

        let ordering = || compare_values(&left, &right);

        let result = match op {
            CompareOp::Eq => ordering() == Ordering::Equal,
            CompareOp::Ne => ordering() != Ordering::Equal,
            CompareOp::Lt => ordering() == Ordering::Less,
            CompareOp::Lte => ordering() != Ordering::Greater,
            CompareOp::Gt => ordering() == Ordering::Greater,
            CompareOp::Gte => ordering() != Ordering::Less,
            CompareOp::In => contains(&right),
            CompareOp::NotIn => !contains(&right),
        };

        Ok(Value::Bool(result))
    }

    fn visit_and(&mut self, exprs: &[Expr]) -> DatabaseResult<Value> {
        for expr in exprs {
            if !is_truthy(&self.visit_expr(expr)?) {
                return Ok(Value::Bool(false));
            }
        }

        Ok(Value::Bool(true))
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> DatabaseResult<Value> {
        for expr in exprs {
            if is_truthy(&self.visit_expr(expr)?) {
                return Ok(Value::Bool(true));
            }
        }

        Ok(Value::Bool(false))
    }

    fn visit_not(&mut self, expr: &Expr) -> DatabaseResult<Value> {
        Ok(Value::Bool(!is_truthy(&self.visit_expr(expr)?)))
    }
}
