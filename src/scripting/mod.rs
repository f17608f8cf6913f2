//! Rhai Program Runner
//!
//! Runs the programs emitted by the program-emitting backend. An emitted
//! program is a sequence of `let` bindings, one per graph node, ending with
//! the terminal's variable:
//!
//! ```rhai
//! let v_sum_0 = fg_add(r_a, r_b);
//! let v_two = 2.0;
//! let v_res = fg_pow(v_sum_0, v_two);
//! v_res
//! ```
//!
//! Root inputs (`r_*`) are pushed into the scope before evaluation.
//!
//! ## Registered Functions
//!
//! - `fg_add`, `fg_sub`, `fg_mult`, `fg_div`, `fg_pow` - Binary arithmetic with scalar broadcasting
//! - `fg_neg`, `fg_sqrt`, `fg_abs`, `fg_sin`, `fg_cos`, `fg_exp`, `fg_log` - Unary math
//! - `fg_compose(parts)` - Gather components into one value
//! - `fg_decompose(value, index)` - Extract one component
//!
//! Each function applies the same operation as the matching built-in
//! filter, so both backends agree on every graph of built-in filters.

mod engine;

pub use engine::ScriptRunner;

use crate::error::{FilterGraphError, Result};
use crate::types::Value;
use rhai::{Array, Dynamic, Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A compiled program that can be executed repeatedly
#[derive(Clone)]
pub struct CompiledProgram {
    /// The compiled AST
    ast: AST,
    /// The original source code
    source: String,
    /// Terminal the program computes
    name: String,
}

impl CompiledProgram {
    pub fn ast(&self) -> &AST {
        &self.ast
    }

    /// Get the source code of this program
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the name of this program
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for CompiledProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledProgram")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Cache for compiled programs to avoid recompilation across sweeps
#[derive(Default)]
pub struct ScriptCache {
    /// Map from program source to compiled program
    cache: HashMap<String, CompiledProgram>,
}

impl ScriptCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Get a cached program or compile and cache it
    pub fn get_or_compile(&mut self, engine: &Engine, name: &str, source: &str) -> Result<CompiledProgram> {
        if let Some(program) = self.cache.get(source) {
            return Ok(program.clone());
        }

        let ast = engine
            .compile(source)
            .map_err(|e| FilterGraphError::Script(format!("Compilation error: {}", e)))?;

        let program = CompiledProgram {
            ast,
            source: source.to_string(),
            name: name.to_string(),
        };

        tracing::debug!("Compiled program for '{}'", name);
        self.cache.insert(source.to_string(), program.clone());
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

/// Thread-safe script cache wrapper
pub type SharedScriptCache = Arc<RwLock<ScriptCache>>;

/// Create a new shared script cache
pub fn create_shared_cache() -> SharedScriptCache {
    Arc::new(RwLock::new(ScriptCache::new()))
}

/// Convert a value into its Rhai representation.
pub fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Float(v) => Dynamic::from_float(*v),
        Value::Array(items) => {
            Dynamic::from_array(items.iter().map(|v| Dynamic::from_float(*v)).collect())
        }
        Value::Composite(items) => Dynamic::from_array(items.iter().map(value_to_dynamic).collect()),
        Value::Text(s) => Dynamic::from(s.clone()),
    }
}

/// Convert a Rhai result back into a value.
///
/// Integers widen to floats; an array of numbers becomes `Value::Array`.
pub fn dynamic_to_value(value: Dynamic) -> Result<Value> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Ok(v) = value.as_float() {
        return Ok(Value::Float(v));
    }
    if let Ok(v) = value.as_int() {
        return Ok(Value::Float(v as f64));
    }
    if value.is_array() {
        let items: Array = value
            .into_array()
            .map_err(|t| FilterGraphError::Script(format!("expected array, got {}", t)))?;
        let values = items
            .into_iter()
            .map(dynamic_to_value)
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::compose(values));
    }
    if value.is_string() {
        return value
            .into_string()
            .map(Value::Text)
            .map_err(|t| FilterGraphError::Script(format!("expected string, got {}", t)));
    }
    Err(FilterGraphError::Script(format!(
        "unsupported program result of type {}",
        value.type_name()
    )))
}
