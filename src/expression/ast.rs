//! Parse tree of an expression network.

use super::token::Span;
use crate::pipeline::nodes::BinaryOp;

/// A parsed network: assignments in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub statements: Vec<Statement>,
}

/// `target = value`
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64, Span),
    Ident(String, Span),
    /// Unary minus
    Neg(Box<Expr>, Span),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    /// `function(args...)`, where `function` is a registered filter tag
    Call {
        function: String,
        args: Vec<Expr>,
        span: Span,
    },
    /// `source[index]`
    Index {
        source: String,
        index: usize,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number(_, span)
            | Expr::Ident(_, span)
            | Expr::Neg(_, span)
            | Expr::Binary { span, .. }
            | Expr::Call { span, .. }
            | Expr::Index { span, .. } => *span,
        }
    }
}
