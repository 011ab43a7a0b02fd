//! Immutable variable bindings used during query execution.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde_json::Value;

#[derive(Debug)]
struct Binding {
    name: String,
    value: Value,
    parent: Option<Arc<Binding>>,
}

/// An immutable snapshot of variable bindings.
///
/// Adding a variable returns a new frame that shares every existing binding with
/// its parent, so the many frames produced by one `For` all point at the same
/// ancestor instead of copying it. A later binding shadows an earlier one with
/// the same name.
///
/// Frames compare by their visible bindings only.
#[derive(Clone, Default)]
pub struct ExecutionFrame {
    head: Option<Arc<Binding>>,
}

impl ExecutionFrame {
    /// The empty frame every execution starts from.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new frame with `name` bound to `value`; `self` is unchanged.
    pub fn with_variable(&self, name: impl Into<String>, value: Value) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                name: name.into(),
                value,
                parent: self.head.clone(),
            })),
        }
    }

    /// Looks up the innermost binding of `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut cursor = self.head.as_deref();

        while let Some(binding) = cursor {
            if binding.name == name {
                return Some(&binding.value);
            }
            cursor = binding.parent.as_deref();
        }

        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The visible bindings, with shadowed ones removed.
    pub fn variables(&self) -> BTreeMap<&str, &Value> {
        let mut variables = BTreeMap::new();
        let mut cursor = self.head.as_deref();

        while let Some(binding) = cursor {
            variables
                .entry(binding.name.as_str())
                .or_insert(&binding.value);
            cursor = binding.parent.as_deref();
        }

        variables
    }
}

impl PartialEq for ExecutionFrame {
    fn eq(&self, other: &Self) -> bool {
        self.variables() == other.variables()
    }
}

impl fmt::Debug for ExecutionFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.variables())
            .finish()
    }
}
