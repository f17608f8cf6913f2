//! Pratt parser for expression networks.
//!
//! ```text
//! network   := sep* (statement (sep+ statement)*)? sep* EOF
//! statement := IDENT '=' expr
//! expr      := prefix (binop expr)*
//! prefix    := '-' prefix | primary
//! primary   := NUMBER | IDENT | IDENT '(' args ')' | IDENT '[' INT ']' | '(' expr ')'
//! ```
//!
//! Binding powers, loosest first: `+ -`, `* /`, unary `-`, `^`. `^` is
//! right-associative, so `-a^2` is `-(a^2)` and `a^b^c` is `a^(b^c)`.
//!
//! Subexpressions nest at most [`MAX_NESTING`] levels deep.

use super::ast::{Expr, Network, Statement};
use super::lexer::Lexer;
use super::token::{Span, Token, TokenKind};
use super::ExpressionError;
use crate::pipeline::nodes::BinaryOp;

const UNARY_BP: u8 = 5;

/// Deepest subexpression nesting (parentheses, call arguments, unary
/// minus, `^` chains) the parser accepts.
pub const MAX_NESTING: usize = 256;

type ParseResult<T> = Result<T, ExpressionError>;

/// Parse expression text into a [`Network`].
pub fn parse_network(text: &str) -> ParseResult<Network> {
    let tokens = Lexer::new(text).tokenize()?;
    Parser::new(tokens).parse_network()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_network(&mut self) -> ParseResult<Network> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.check(&TokenKind::Eof) {
            statements.push(self.parse_statement()?);
            if !self.check(&TokenKind::Eof) {
                self.expect(TokenKind::Separator)?;
            }
            self.skip_separators();
        }
        Ok(Network { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let span = self.current_span();
        let target = match self.peek_kind() {
            TokenKind::Ident(name) => {
                self.advance();
                name
            }
            _ => return Err(self.error_unexpected("an assignment target")),
        };
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr_bp(0)?;
        Ok(Statement { target, value, span })
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(ExpressionError::SyntaxError {
                offset: self.current_span().offset,
                message: format!("expression nested more than {} levels deep", MAX_NESTING),
            });
        }
        self.depth += 1;
        let result = self.parse_binary(min_bp);
        self.depth -= 1;
        result
    }

    fn parse_binary(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let (op, (l_bp, r_bp)) = match self.peek_kind() {
                TokenKind::Plus => (BinaryOp::Add, (1, 2)),
                TokenKind::Minus => (BinaryOp::Sub, (1, 2)),
                TokenKind::Star => (BinaryOp::Mult, (3, 4)),
                TokenKind::Slash => (BinaryOp::Div, (3, 4)),
                TokenKind::Caret => (BinaryOp::Pow, (8, 7)), // right-assoc
                _ => break,
            };
            if l_bp < min_bp {
                break;
            }

            let span = self.advance().span;
            let rhs = self.parse_expr_bp(r_bp)?;
            lhs = Expr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        if self.check(&TokenKind::Minus) {
            let span = self.advance().span;
            let operand = self.parse_expr_bp(UNARY_BP)?;
            return Ok(Expr::Neg(Box::new(operand), span));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        match self.peek_kind() {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Number(n as f64, span))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(Expr::Number(v, span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr_bp(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                self.advance();
                match self.peek_kind() {
                    TokenKind::LParen => {
                        self.advance();
                        let args = self.parse_args()?;
                        Ok(Expr::Call {
                            function: name,
                            args,
                            span,
                        })
                    }
                    TokenKind::LBracket => {
                        self.advance();
                        let index = self.parse_index()?;
                        self.expect(TokenKind::RBracket)?;
                        Ok(Expr::Index {
                            source: name,
                            index,
                            span,
                        })
                    }
                    _ => Ok(Expr::Ident(name, span)),
                }
            }
            _ => Err(self.error_unexpected("an expression")),
        }
    }

    /// Comma-separated arguments up to and including the closing `)`.
    fn parse_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr_bp(0)?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect(TokenKind::RParen)?;
            return Ok(args);
        }
    }

    fn parse_index(&mut self) -> ParseResult<usize> {
        let span = self.current_span();
        match self.peek_kind() {
            TokenKind::Int(n) => {
                self.advance();
                usize::try_from(n).map_err(|_| ExpressionError::SyntaxError {
                    offset: span.offset,
                    message: format!("index {} is out of range", n),
                })
            }
            _ => Err(self.error_unexpected("an integer index")),
        }
    }

    // ── Token stream helpers ──

    fn skip_separators(&mut self) {
        while self.check(&TokenKind::Separator) {
            self.advance();
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn current_span(&self) -> Span {
        self.peek().span
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_unexpected(&kind.to_string()))
        }
    }

    fn error_unexpected(&self, expected: &str) -> ExpressionError {
        ExpressionError::SyntaxError {
            offset: self.current_span().offset,
            message: format!("expected {}, found {}", expected, self.peek().kind),
        }
    }
}
