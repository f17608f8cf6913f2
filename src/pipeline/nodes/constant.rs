//! Constant and identity filters.
//!
//! `const` has no inputs and is therefore always a traversal source; the
//! expression compiler creates one per numeric literal. `identity` forwards
//! its single input and gives a statement like `res = a` a node to name.

use crate::pipeline::emitter::float_literal;
use crate::pipeline::error::OperationError;
use crate::pipeline::node::FilterInputs;
use crate::pipeline::nodes::arithmetic::UNARY_PORTS;
use crate::pipeline::port::PortDescriptor;
use crate::types::{ParamMap, Value};

/// Name of the parameter carrying a constant's value.
pub const VALUE_PARAM: &str = "value";

/// Constant source filter.
#[derive(Debug, Clone, Default)]
pub struct ConstantFilter;

impl ConstantFilter {
    pub fn name(&self) -> &str {
        "const"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        &[]
    }

    fn value(params: &ParamMap) -> Result<f64, OperationError> {
        params
            .get(VALUE_PARAM)
            .and_then(|p| p.as_float())
            .ok_or(OperationError::MissingParameter(VALUE_PARAM))
    }

    pub fn execute(&self, params: &ParamMap) -> Result<Value, OperationError> {
        Self::value(params).map(Value::Float)
    }

    pub fn emit(&self, params: &ParamMap) -> Result<String, OperationError> {
        float_literal(Self::value(params)?)
    }
}

/// Pass-through filter.
#[derive(Debug, Clone, Default)]
pub struct IdentityFilter;

impl IdentityFilter {
    pub fn name(&self) -> &str {
        "identity"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        UNARY_PORTS
    }

    pub fn execute(&self, inputs: &FilterInputs) -> Result<Value, OperationError> {
        inputs.require(0, "in").cloned()
    }

    pub fn emit(&self, inputs: &[Option<String>]) -> Result<String, OperationError> {
        inputs
            .first()
            .and_then(|v| v.clone())
            .ok_or(OperationError::MissingInput("in"))
    }
}
