//! Root registry: externally supplied values a graph reads by name.

use crate::pipeline::error::{GraphError, GraphResult};
use crate::pipeline::graph::DEFAULT_ROOT_PREFIX;
use crate::types::Value;
use std::collections::BTreeMap;

/// Prefixed root name → value.
#[derive(Debug, Clone)]
pub struct RootRegistry {
    prefix: char,
    values: BTreeMap<String, Value>,
}

impl Default for RootRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_PREFIX)
    }
}

impl RootRegistry {
    pub fn new(prefix: char) -> Self {
        Self {
            prefix,
            values: BTreeMap::new(),
        }
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// The name without its prefix (`":a"` → `"a"`).
    pub fn bare_name<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix(self.prefix).unwrap_or(name)
    }

    /// Prefix a bare name (`"a"` → `":a"`).
    pub fn root_name(&self, bare: &str) -> String {
        format!("{}{}", self.prefix, bare)
    }

    /// Bind `name` to `value`, returning the previous value.
    pub fn insert(&mut self, name: &str, value: Value) -> GraphResult<Option<Value>> {
        match name.strip_prefix(self.prefix) {
            Some(bare) if !bare.is_empty() && !bare.contains(char::is_whitespace) => {
                Ok(self.values.insert(name.to_string(), value))
            }
            _ => Err(GraphError::InvalidName {
                name: name.to_string(),
                reason: format!("root names are '{}' followed by a non-empty name", self.prefix),
            }),
        }
    }

    pub fn remove(&mut self, name: &str) -> GraphResult<Value> {
        self.values
            .remove(name)
            .ok_or_else(|| GraphError::UnboundRoot(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Root names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
