//! Per-request context accumulated across pipeline stages.
//!
//! A [`Context`] starts empty for each request and grows as continuing
//! stages contribute fragments. Fragments are shallow-merged in stage
//! order; on key collision the later fragment wins (last-write-wins).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-request data, merged across pipeline stages.
///
/// The context is a string-keyed JSON map. Stages receive the context
/// accumulated so far and return a fragment (itself a `Context`) to be
/// merged into it. Stages never mutate the context they are given.
///
/// Merge semantics are shallow and last-write-wins: a later fragment
/// that reuses a key replaces the earlier value wholesale, nested
/// objects are not merged recursively.
///
/// # Example
///
/// ```
/// use viaduct_core::Context;
/// use serde_json::json;
///
/// let mut ctx = Context::new();
/// ctx.merge(Context::new().with("user", json!({"id": 7})));
/// ctx.merge(Context::new().with("role", json!("admin")));
///
/// assert_eq!(ctx.get("user"), Some(&json!({"id": 7})));
/// assert_eq!(ctx.get("role"), Some(&json!("admin")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    fields: Map<String, Value>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Returns a copy of this context with one additional field.
    ///
    /// Useful for building fragments inline.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Inserts a field, replacing any existing value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Checks whether a field exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the context holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow-merges a fragment into this context.
    ///
    /// Keys present in `fragment` replace keys already present here
    /// (last-write-wins). This is the documented collision rule for
    /// the whole pipeline: later stages deliberately override earlier
    /// ones on key collision.
    pub fn merge(&mut self, fragment: Self) {
        for (key, value) in fragment.fields {
            self.fields.insert(key, value);
        }
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Consumes the context, returning it as a JSON object value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for Context {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
