//! Built-in filter implementations.

pub mod arithmetic;
pub mod array;
pub mod constant;

pub use arithmetic::{BinaryFilter, BinaryOp, UnaryFilter, UnaryOp};
pub use array::{ComposeFilter, DecomposeFilter, COMPOSE_ARITY, INDEX_PARAM};
pub use constant::{ConstantFilter, IdentityFilter, VALUE_PARAM};

use crate::pipeline::filter_type::FilterType;
use crate::pipeline::node::BuiltinFilter;
use crate::types::ParamValue;

/// Filter types for every built-in filter, in registration order.
pub fn builtin_filter_types() -> Vec<FilterType> {
    let mut types = Vec::new();

    for &op in BinaryOp::all() {
        let filter = BinaryFilter::new(op);
        types.push(FilterType::builtin(
            op.tag(),
            filter.ports().to_vec(),
            Vec::new(),
            BuiltinFilter::Binary(filter),
        ));
    }

    for &op in UnaryOp::all() {
        let filter = UnaryFilter::new(op);
        types.push(FilterType::builtin(
            op.tag(),
            filter.ports().to_vec(),
            Vec::new(),
            BuiltinFilter::Unary(filter),
        ));
    }

    types.push(FilterType::builtin(
        "const",
        ConstantFilter.ports().to_vec(),
        vec![(VALUE_PARAM, ParamValue::Float(0.0))],
        BuiltinFilter::Constant(ConstantFilter),
    ));
    types.push(FilterType::builtin(
        "identity",
        IdentityFilter.ports().to_vec(),
        Vec::new(),
        BuiltinFilter::Identity(IdentityFilter),
    ));
    types.push(FilterType::builtin(
        "compose",
        ComposeFilter.ports().to_vec(),
        Vec::new(),
        BuiltinFilter::Compose(ComposeFilter),
    ));
    types.push(FilterType::builtin(
        "decompose",
        DecomposeFilter.ports().to_vec(),
        vec![(INDEX_PARAM, ParamValue::Int(0))],
        BuiltinFilter::Decompose(DecomposeFilter),
    ));

    types
}
