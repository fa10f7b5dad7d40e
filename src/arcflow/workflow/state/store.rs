// SPDX-License-Identifier: MIT

//! JSON-backed state storage

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::State;

/// String-keyed state with last-writer-wins merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap {
    fields: Map<String, Value>,
}

impl StateMap {
    /// Create an empty StateMap
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(key, value)` pairs
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a nested field value using dot notation (e.g., "result.intent")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Field is present and holds a truthy value
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.fields.get(key) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(o)) => !o.is_empty(),
            Some(Value::Number(_)) | Some(Value::Bool(true)) => true,
        }
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl State for StateMap {
    type Update = StateMap;

    fn merge(&mut self, update: StateMap) {
        for (k, v) in update.fields {
            self.fields.insert(k, v);
        }
    }
}

/// Non-object values yield an empty map
impl From<Value> for StateMap {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::new(),
        }
    }
}
