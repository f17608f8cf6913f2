//! Hand-written scanner turning expression text into tokens.
//!
//! Newlines separate statements only outside parentheses and brackets, so
//! a call's argument list may span several lines. `#` starts a comment
//! running to the end of the line.

use super::token::{Span, Token, TokenKind};
use super::ExpressionError;

pub struct Lexer<'src> {
    src: &'src str,
    bytes: &'src [u8],
    pos: usize,
    /// Open `(` / `[` count
    depth: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            depth: 0,
        }
    }

    /// Tokenize the whole source. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, ExpressionError> {
        self.skip_blanks();

        let start = self.pos;
        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, 0)));
        };

        if ch.is_ascii_digit() {
            return self.lex_number(start);
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.lex_ident(start));
        }

        self.pos += 1;
        let kind = match ch {
            '\n' | ';' => TokenKind::Separator,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '=' => TokenKind::Eq,
            ',' => TokenKind::Comma,
            '(' => {
                self.depth += 1;
                TokenKind::LParen
            }
            '[' => {
                self.depth += 1;
                TokenKind::LBracket
            }
            ')' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RParen
            }
            ']' => {
                self.depth = self.depth.saturating_sub(1);
                TokenKind::RBracket
            }
            other => {
                return Err(ExpressionError::SyntaxError {
                    offset: start,
                    message: format!("unexpected character '{}'", other),
                })
            }
        };
        Ok(Token::new(kind, Span::new(start, self.pos - start)))
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    /// Skip spaces, comments, and newlines that cannot end a statement.
    fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                '#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                '\n' if self.depth == 0 => break,
                c if c.is_whitespace() => self.pos += c.len_utf8(),
                _ => break,
            }
        }
    }

    fn lex_ident(&mut self, start: usize) -> Token {
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        let name = self.src[start..self.pos].to_string();
        Token::new(TokenKind::Ident(name), Span::new(start, self.pos - start))
    }

    fn lex_number(&mut self, start: usize) -> Result<Token, ExpressionError> {
        let mut is_float = false;
        self.eat_digits();

        if self.peek() == Some('.') {
            is_float = true;
            self.pos += 1;
            self.eat_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                self.eat_digits();
            } else {
                // Not an exponent; leave `e` for the next token
                self.pos = mark;
            }
        }

        let text = &self.src[start..self.pos];
        let span = Span::new(start, self.pos - start);
        let invalid = || ExpressionError::SyntaxError {
            offset: start,
            message: format!("invalid number literal '{}'", text),
        };
        let kind = if is_float {
            TokenKind::Float(text.parse().map_err(|_| invalid())?)
        } else {
            TokenKind::Int(text.parse().map_err(|_| invalid())?)
        };
        Ok(Token::new(kind, span))
    }

    fn eat_digits(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators_and_literals() {
        assert_eq!(
            kinds("r = a^2.5 - 3"),
            vec![
                TokenKind::Ident("r".into()),
                TokenKind::Eq,
                TokenKind::Ident("a".into()),
                TokenKind::Caret,
                TokenKind::Float(2.5),
                TokenKind::Minus,
                TokenKind::Int(3),
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
    }

    #[test]
    fn test_newlines_inside_brackets_are_ignored() {
        let k = kinds("x = f(a,\n b)\ny = x # trailing\n");
        let separators = k.iter().filter(|t| **t == TokenKind::Separator).count();
        assert_eq!(separators, 2);
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("x = a $ b").tokenize().unwrap_err();
        assert!(matches!(err, ExpressionError::SyntaxError { offset: 6, .. }));
    }
}
