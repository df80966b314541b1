//! The recursive-descent parser. Enforces the structural grammar over the token stream,
//! with exactly one token of lookahead:
//!
//! ```text
//! document  := value EOF
//! value     := object | array | STRING | NUMBER | TRUE | FALSE | NULL
//! object    := '{' ( member (',' member)* )? '}'
//! member    := STRING ':' value
//! array     := '[' ( value (',' value)* )? ']'
//! ```
//!
//! The first error anywhere in the descent is terminal; enclosing productions wrap it
//! with their own context on the way out.

use tracing::*;

use crate::diagnostics::Diagnostic;
use crate::lexer::Lexer;
use crate::source::CodePoints;
use crate::token::{Token, TokenKind};

/// Default bound on object/array nesting. The grammar itself is depth-independent; the
/// bound only keeps pathological inputs from overflowing the call stack.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

pub struct Parser<S> {
    lx: Lexer<S>,
    tok: Token,
    depth: usize,
    max_depth: usize,
}

impl<S: CodePoints> Parser<S> {
    pub fn new(src: S) -> Self {
        let mut lx = Lexer::new(src);
        let tok = lx.next_token();
        Parser {
            lx,
            tok,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Replace the nesting bound.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Validate one complete document. Consumes the parser: a `Parser` validates exactly
    /// one document over its lifetime.
    #[instrument(level = "debug", skip_all)]
    pub fn parse(mut self) -> Result<(), Diagnostic> {
        self.parse_value().map_err(|e| e.wrap("parse failure"))?;

        if self.tok.kind != TokenKind::Eof {
            return Err(Diagnostic::at_token(
                format!("additional top level token: {}", self.tok),
                &self.tok,
            ));
        }

        Ok(())
    }

    fn advance(&mut self) {
        self.tok = self.lx.next_token();
        trace!(tok = %self.tok, "lookahead");
    }

    fn parse_value(&mut self) -> Result<(), Diagnostic> {
        match self.tok.kind {
            TokenKind::LBrace => self.parse_object(),
            TokenKind::LBracket => self.parse_array(),
            TokenKind::Str
            | TokenKind::Number
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null => {
                self.advance();
                Ok(())
            }
            // Lexical and read failures ride on Illegal tokens; their message already
            // names the problem, so surface it as-is.
            TokenKind::Illegal => Err(Diagnostic::at_token(self.tok.literal.clone(), &self.tok)),
            _ => Err(Diagnostic::at_token(
                format!("invalid expression, unexpected token: {}", self.tok),
                &self.tok,
            )),
        }
    }

    fn parse_array(&mut self) -> Result<(), Diagnostic> {
        self.enter_nested()?;
        self.advance();

        if self.tok.kind == TokenKind::RBracket {
            self.advance();
            self.depth -= 1;
            return Ok(());
        }

        self.parse_value()
            .map_err(|e| e.wrap("bad expression in array"))?;
        while self.tok.kind == TokenKind::Comma {
            self.advance();
            self.parse_value()
                .map_err(|e| e.wrap("bad expression in array"))?;
        }

        if self.tok.kind != TokenKind::RBracket {
            return Err(Diagnostic::at_token(
                format!("malformed array, expected ']', got '{}'", self.tok),
                &self.tok,
            ));
        }
        self.advance();
        self.depth -= 1;

        Ok(())
    }

    fn parse_object(&mut self) -> Result<(), Diagnostic> {
        self.enter_nested()?;
        self.advance();

        if self.tok.kind == TokenKind::RBrace {
            self.advance();
            self.depth -= 1;
            return Ok(());
        }

        self.parse_member()?;
        while self.tok.kind == TokenKind::Comma {
            self.advance();
            self.parse_member()?;
        }

        if self.tok.kind != TokenKind::RBrace {
            return Err(Diagnostic::at_token(
                format!("malformed object, expected '}}', got '{}'", self.tok),
                &self.tok,
            ));
        }
        self.advance();
        self.depth -= 1;

        Ok(())
    }

    fn parse_member(&mut self) -> Result<(), Diagnostic> {
        if self.tok.kind != TokenKind::Str {
            return Err(Diagnostic::at_token(
                format!("expected key string in object, found {}", self.tok),
                &self.tok,
            ));
        }
        self.advance();

        if self.tok.kind != TokenKind::Colon {
            return Err(Diagnostic::at_token(
                format!("expected ':' in object, found {}", self.tok),
                &self.tok,
            ));
        }
        self.advance();

        self.parse_value()
            .map_err(|e| e.wrap("bad expression in object"))
    }

    /// Guard entry into an object or array. Called with the lookahead on the opening
    /// delimiter.
    fn enter_nested(&mut self) -> Result<(), Diagnostic> {
        if self.depth >= self.max_depth {
            return Err(Diagnostic::at_token(
                format!("nesting too deep (limit {})", self.max_depth),
                &self.tok,
            ));
        }
        self.depth += 1;
        Ok(())
    }
}
