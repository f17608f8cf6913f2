//! Compose / decompose filters: multi-component values.
//!
//! `compose` gathers up to [`COMPOSE_ARITY`] inputs into one value (scalars
//! collapse to an array). `decompose` exposes component `index` of its input.
//! The expression compiler inserts `decompose` nodes for `name[i]` reads.

use crate::pipeline::error::OperationError;
use crate::pipeline::node::FilterInputs;
use crate::pipeline::nodes::arithmetic::UNARY_PORTS;
use crate::pipeline::port::PortDescriptor;
use crate::types::{ParamMap, Value};

/// Maximum number of components a single `compose` node gathers.
pub const COMPOSE_ARITY: usize = 4;

/// Name of the parameter selecting a component.
pub const INDEX_PARAM: &str = "index";

pub(crate) static COMPOSE_PORTS: &[PortDescriptor] = &[
    PortDescriptor::required("in_0"),
    PortDescriptor::optional("in_1"),
    PortDescriptor::optional("in_2"),
    PortDescriptor::optional("in_3"),
];

#[derive(Debug, Clone, Default)]
pub struct ComposeFilter;

impl ComposeFilter {
    pub fn name(&self) -> &str {
        "compose"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        COMPOSE_PORTS
    }

    pub fn execute(&self, inputs: &FilterInputs) -> Result<Value, OperationError> {
        inputs.require(0, "in_0")?;
        Ok(Value::compose(inputs.bound().cloned().collect()))
    }

    pub fn emit(&self, inputs: &[Option<String>]) -> Result<String, OperationError> {
        let parts: Vec<&str> = inputs.iter().flatten().map(String::as_str).collect();
        if parts.is_empty() {
            return Err(OperationError::MissingInput("in_0"));
        }
        Ok(format!("fg_compose([{}])", parts.join(", ")))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecomposeFilter;

impl DecomposeFilter {
    pub fn name(&self) -> &str {
        "decompose"
    }

    pub fn ports(&self) -> &'static [PortDescriptor] {
        UNARY_PORTS
    }

    fn index(params: &ParamMap) -> Result<i64, OperationError> {
        params
            .get(INDEX_PARAM)
            .and_then(|p| p.as_int())
            .ok_or(OperationError::MissingParameter(INDEX_PARAM))
    }

    pub fn execute(&self, params: &ParamMap, inputs: &FilterInputs) -> Result<Value, OperationError> {
        let index = Self::index(params)?;
        let source = inputs.require(0, "in")?;
        usize::try_from(index)
            .ok()
            .and_then(|i| source.component(i))
            .ok_or(OperationError::IndexOutOfRange {
                index,
                len: source.component_count(),
            })
    }

    pub fn emit(&self, params: &ParamMap, inputs: &[Option<String>]) -> Result<String, OperationError> {
        let index = Self::index(params)?;
        let source = inputs
            .first()
            .and_then(|v| v.as_deref())
            .ok_or(OperationError::MissingInput("in"))?;
        Ok(format!("fg_decompose({}, {})", source, index))
    }
}
