//! Query functions callable from expressions.
//!
//! The [`FunctionRegistry`] maps case-insensitive names to implementations. Built-ins
//! are installed by [`FunctionRegistry::new`]; applications may add or override
//! functions with [`FunctionRegistry::register`]. Functions that read documents receive
//! the database on every call and resolve collections by name, so they see collections
//! created or deleted after the registry was built.
//!
//! # Built-ins
//!
//! | Name         | Arguments                        | Result                                   |
//! |--------------|----------------------------------|------------------------------------------|
//! | `CONCAT`     | any number                       | string forms of all arguments, joined    |
//! | `DOCUMENT`   | `id` or `[id, ...]`              | document by `collection/key`, or `null`  |
//! | `DOCUMENT`   | `collection, key` or `[key, ..]` | document by collection and key           |
//! | `COLLECTION` | `name`                           | array of every document in a collection  |
//! | `LENGTH`     | `value`                          | length of an array, object or string     |
//! | `MERGE`      | `object, ...`                    | shallow merge, later attributes win      |
//! | `DATE_NOW`   | none                             | milliseconds since the Unix epoch        |

use std::{collections::HashMap, fmt, sync::Arc};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    backend::DatabaseBackend,
    document_id::DocumentId,
    error::{DatabaseError, DatabaseResult},
};

/// Signature of a query function.
pub type FunctionImpl =
    Arc<dyn Fn(&dyn DatabaseBackend, &[Value]) -> DatabaseResult<Value> + Send + Sync>;

/// Case-insensitive map of function names to implementations.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionImpl>,
}

impl FunctionRegistry {
    /// Creates a registry with the built-in functions installed.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry
            .register("CONCAT", concat)
            .register("DOCUMENT", document)
            .register("COLLECTION", collection)
            .register("LENGTH", length)
            .register("MERGE", merge)
            .register("DATE_NOW", date_now);

        registry
    }

    /// Creates a registry without any functions.
    pub fn empty() -> Self {
        Self { functions: HashMap::new() }
    }

    /// Registers `function` under `name`, replacing any earlier registration.
    pub fn register<F>(&mut self, name: &str, function: F) -> &mut Self
    where
        F: Fn(&dyn DatabaseBackend, &[Value]) -> DatabaseResult<Value> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_uppercase(), Arc::new(function));
        self
    }

    /// Whether a function is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_uppercase())
    }

    /// Calls the function registered under `name`.
    ///
    /// # Errors
    ///
    /// 404/1582 if no such function exists; otherwise whatever the function raises.
    pub fn evaluate(&self, database: &dyn DatabaseBackend, name: &str, args: &[Value]) -> DatabaseResult<Value> {
        let function = self
            .functions
            .get(&name.to_uppercase())
            .ok_or_else(|| DatabaseError::unknown_function(name))?;

        trace!(function = name, args = args.len(), "calling function");

        function(database, args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.functions.keys().collect();
        names.sort();

        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

fn check_arity(name: &str, args: &[Value], min: usize, max: usize) -> DatabaseResult<()> {
    if args.len() < min || args.len() > max {
        return Err(DatabaseError::argument_count(name, min, max));
    }
    Ok(())
}

fn string_arg<'v>(name: &str, value: &'v Value) -> DatabaseResult<&'v str> {
    value
        .as_str()
        .ok_or_else(|| DatabaseError::argument_type(name))
}

fn concat(_: &dyn DatabaseBackend, args: &[Value]) -> DatabaseResult<Value> {
    let mut result = String::new();

    for arg in args {
        match arg {
            Value::Null => {}
            Value::String(s) => result.push_str(s),
            other => result.push_str(&other.to_string()),
        }
    }

    Ok(Value::String(result))
}

fn document(database: &dyn DatabaseBackend, args: &[Value]) -> DatabaseResult<Value> {
    check_arity("DOCUMENT", args, 1, 2)?;

    let fetch_id = |id: &str| -> DatabaseResult<Option<Value>> {
        let id = DocumentId::parse(Some(id))?;
        database.get_document(id.collection().unwrap_or_default(), id.key())
    };

    match args {
        [Value::String(id)] => Ok(fetch_id(id)?.unwrap_or(Value::Null)),
        [Value::Array(ids)] => {
            let mut documents = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(document) = fetch_id(string_arg("DOCUMENT", id)?)? {
                    documents.push(document);
                }
            }
            Ok(Value::Array(documents))
        }
        [collection, Value::Array(keys)] => {
            let collection = string_arg("DOCUMENT", collection)?;
            let mut documents = Vec::with_capacity(keys.len());
            for key in keys {
                let key = string_arg("DOCUMENT", key)?;
                if let Some(document) = database.get_document(collection, Some(key))? {
                    documents.push(document);
                }
            }
            Ok(Value::Array(documents))
        }
        [collection, key] => {
            let collection = string_arg("DOCUMENT", collection)?;
            let key = string_arg("DOCUMENT", key)?;
            Ok(database
                .get_document(collection, Some(key))?
                .unwrap_or(Value::Null))
        }
        _ => Err(DatabaseError::argument_type("DOCUMENT")),
    }
}

fn collection(database: &dyn DatabaseBackend, args: &[Value]) -> DatabaseResult<Value> {
    check_arity("COLLECTION", args, 1, 1)?;

    let name = string_arg("COLLECTION", &args[0])?;
    Ok(Value::Array(database.documents(name)?))
}

fn length(_: &dyn DatabaseBackend, args: &[Value]) -> DatabaseResult<Value> {
    check_arity("LENGTH", args, 1, 1)?;

    let length = match &args[0] {
        Value::Null => 0,
        Value::Bool(value) => usize::from(*value),
        Value::Number(value) => value.to_string().len(),
        Value::String(value) => value.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(object) => object.len(),
    };

    Ok(Value::from(length))
}

fn merge(_: &dyn DatabaseBackend, args: &[Value]) -> DatabaseResult<Value> {
    check_arity("MERGE", args, 1, usize::MAX)?;

    let mut merged = Map::new();

    for arg in args {
        let object = arg
            .as_object()
            .ok_or_else(|| DatabaseError::argument_type("MERGE"))?;

        for (name, value) in object {
            merged.insert(name.clone(), value.clone());
        }
    }

    Ok(Value::Object(merged))
}

fn date_now(_: &dyn DatabaseBackend, args: &[Value]) -> DatabaseResult<Value> {
    check_arity("DATE_NOW", args, 0, 0)?;

    Ok(Value::from(Utc::now().timestamp_millis()))
}
