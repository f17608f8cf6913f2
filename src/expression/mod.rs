//! Expression compiler.
//!
//! Turns assignment text such as
//!
//! ```text
//! s   = a + b
//! res = s^2 + (a - b)^2
//! ```
//!
//! into filter nodes inside a [`Context`](crate::workspace::Context).
//! Identifiers name earlier targets, bound roots (`a` reads `:a`) or
//! existing nodes; `f(x, y)` instantiates the registered filter `f`;
//! `v[i]` reads one component of a composed value.

pub mod ast;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Expr, Network, Statement};
pub use generator::Generator;
pub use parser::parse_network;

use crate::pipeline::error::GraphError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExpressionError {
    #[error("Syntax error at offset {offset}: {message}")]
    SyntaxError { offset: usize, message: String },

    #[error("Unbound identifier '{name}' at offset {offset}")]
    UnboundIdentifier { name: String, offset: usize },

    #[error("'{function}' takes {expected} argument(s), got {got} (offset {offset})")]
    ArityMismatch {
        function: String,
        expected: usize,
        got: usize,
        offset: usize,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
