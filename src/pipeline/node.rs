//! Filter operation abstraction for the pipeline.
//!
//! Two-layer design:
//! - **`FilterOperation` trait**: for plugin filters registered by the host
//!   (file renames, shell commands, image composition, ...).
//! - **`BuiltinFilter` enum**: for the built-in arithmetic and array filters.
//!
//! `AnyFilter` wraps either variant so the executor and the program emitter
//! can handle both uniformly.

use crate::pipeline::error::OperationError;
use crate::pipeline::nodes::{
    BinaryFilter, ComposeFilter, ConstantFilter, DecomposeFilter, IdentityFilter, UnaryFilter,
};
use crate::types::{ParamMap, Value};
use std::fmt;
use std::sync::Arc;

/// Resolved input values of one node invocation, in port order.
///
/// Unconnected optional ports are `None`. The executor hands over owned
/// values: the last reader of an upstream result receives it by move.
#[derive(Debug, Default)]
pub struct FilterInputs {
    values: Vec<Option<Value>>,
}

impl FilterInputs {
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self { values }
    }

    /// Number of declared ports.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Input at `index`, or `MissingInput(port)` if it is not bound.
    pub fn require(&self, index: usize, port: &'static str) -> Result<&Value, OperationError> {
        self.get(index).ok_or(OperationError::MissingInput(port))
    }

    /// Bound inputs in port order, skipping unconnected optional ports.
    pub fn bound(&self) -> impl Iterator<Item = &Value> {
        self.values.iter().flatten()
    }
}

/// Trait for pluggable/user-defined filters.
pub trait FilterOperation: Send + Sync {
    /// Human-readable name of this operation.
    fn name(&self) -> &str;

    /// Compute the node's output from its parameters and inputs.
    fn execute(&self, params: &ParamMap, inputs: &FilterInputs) -> Result<Value, OperationError>;

    /// Program text computing this node's output from the named inputs.
    ///
    /// `inputs` holds the program variable bound to each port (in port order).
    fn emit(&self, _params: &ParamMap, _inputs: &[Option<String>]) -> Result<String, OperationError> {
        Err(OperationError::EmitUnsupported(self.name().to_string()))
    }
}

/// Enum dispatch for built-in filters.
#[derive(Debug, Clone)]
pub enum BuiltinFilter {
    Binary(BinaryFilter),
    Unary(UnaryFilter),
    Constant(ConstantFilter),
    Identity(IdentityFilter),
    Compose(ComposeFilter),
    Decompose(DecomposeFilter),
}

impl BuiltinFilter {
    pub fn name(&self) -> &str {
        match self {
            BuiltinFilter::Binary(f) => f.name(),
            BuiltinFilter::Unary(f) => f.name(),
            BuiltinFilter::Constant(f) => f.name(),
            BuiltinFilter::Identity(f) => f.name(),
            BuiltinFilter::Compose(f) => f.name(),
            BuiltinFilter::Decompose(f) => f.name(),
        }
    }

    pub fn execute(&self, params: &ParamMap, inputs: &FilterInputs) -> Result<Value, OperationError> {
        match self {
            BuiltinFilter::Binary(f) => f.execute(inputs),
            BuiltinFilter::Unary(f) => f.execute(inputs),
            BuiltinFilter::Constant(f) => f.execute(params),
            BuiltinFilter::Identity(f) => f.execute(inputs),
            BuiltinFilter::Compose(f) => f.execute(inputs),
            BuiltinFilter::Decompose(f) => f.execute(params, inputs),
        }
    }

    pub fn emit(&self, params: &ParamMap, inputs: &[Option<String>]) -> Result<String, OperationError> {
        match self {
            BuiltinFilter::Binary(f) => f.emit(inputs),
            BuiltinFilter::Unary(f) => f.emit(inputs),
            BuiltinFilter::Constant(f) => f.emit(params),
            BuiltinFilter::Identity(f) => f.emit(inputs),
            BuiltinFilter::Compose(f) => f.emit(inputs),
            BuiltinFilter::Decompose(f) => f.emit(params, inputs),
        }
    }
}

/// Wrapper that holds either a built-in filter (enum dispatch) or a plugin (trait object).
#[derive(Clone)]
pub enum AnyFilter {
    Builtin(BuiltinFilter),
    Plugin(Arc<dyn FilterOperation>),
}

impl AnyFilter {
    pub fn name(&self) -> &str {
        match self {
            AnyFilter::Builtin(f) => f.name(),
            AnyFilter::Plugin(f) => f.name(),
        }
    }

    pub fn execute(&self, params: &ParamMap, inputs: &FilterInputs) -> Result<Value, OperationError> {
        match self {
            AnyFilter::Builtin(f) => f.execute(params, inputs),
            AnyFilter::Plugin(f) => f.execute(params, inputs),
        }
    }

    pub fn emit(&self, params: &ParamMap, inputs: &[Option<String>]) -> Result<String, OperationError> {
        match self {
            AnyFilter::Builtin(f) => f.emit(params, inputs),
            AnyFilter::Plugin(f) => f.emit(params, inputs),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, AnyFilter::Builtin(_))
    }
}

impl fmt::Debug for AnyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyFilter::Builtin(b) => f.debug_tuple("Builtin").field(b).finish(),
            AnyFilter::Plugin(p) => f.debug_tuple("Plugin").field(&p.name()).finish(),
        }
    }
}
