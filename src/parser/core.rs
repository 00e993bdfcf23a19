//! Core parser struct and helper methods.

use crate::ast::Program;
use crate::error::{ParseErrors, ParserError};
use crate::lexer::{Scanner, Token, TokenKind};
use crate::parser::precedence::{get_precedence, Precedence};

/// Result of a single parse step. `None` means the construct was unparseable
/// and a diagnostic has already been recorded.
pub type ParseResult<T> = Option<T>;

/// The parser for Monkey.
///
/// Pulls tokens from the scanner on demand with two tokens of lookahead.
/// Errors never stop the parse; they accumulate and the parser resumes at
/// the next statement boundary.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    pub(crate) cur_token: Token,
    pub(crate) peek_token: Token,
    errors: Vec<ParserError>,
}

impl<'a> Parser<'a> {
    pub fn new(scanner: Scanner<'a>) -> Self {
        let mut parser = Self {
            scanner,
            cur_token: Token::default(),
            peek_token: Token::default(),
            errors: Vec::new(),
        };

        // Fill both cur_token and peek_token
        parser.next_token();
        parser.next_token();

        parser
    }

    pub fn from_source(source: &'a str) -> Self {
        Self::new(Scanner::new(source))
    }

    /// Parse a complete program.
    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.cur_token_is(TokenKind::Eof) {
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
            self.next_token();
        }

        tracing::debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );

        Program::new(statements)
    }

    /// Diagnostics collected so far, in the order they were found.
    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    pub fn into_errors(self) -> ParseErrors {
        ParseErrors(self.errors)
    }

    // ===== Token manipulation =====

    pub(crate) fn next_token(&mut self) {
        let next = self.scanner.next_token();
        self.cur_token = std::mem::replace(&mut self.peek_token, next);
    }

    pub(crate) fn cur_token_is(&self, kind: TokenKind) -> bool {
        self.cur_token.kind == kind
    }

    pub(crate) fn peek_token_is(&self, kind: TokenKind) -> bool {
        self.peek_token.kind == kind
    }

    /// Advance only if the next token has the expected kind.
    pub(crate) fn expect_peek(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.peek_token_is(kind) {
            self.next_token();
            Some(())
        } else {
            self.peek_error(kind);
            None
        }
    }

    pub(crate) fn peek_precedence(&self) -> Precedence {
        get_precedence(self.peek_token.kind)
    }

    pub(crate) fn cur_precedence(&self) -> Precedence {
        get_precedence(self.cur_token.kind)
    }

    // ===== Diagnostics =====

    pub(crate) fn record(&mut self, error: ParserError) {
        tracing::trace!(%error, "parse error");
        self.errors.push(error);
    }

    fn peek_error(&mut self, expected: TokenKind) {
        let error =
            ParserError::unexpected_token(expected, self.peek_token.kind, self.peek_token.span);
        self.record(error);
    }

    /// Skip the rest of an unparseable statement: stop on its `;`, or just
    /// before a closing `}` or the end of input, so the caller's own
    /// `next_token` lands on the next statement.
    pub(crate) fn synchronize(&mut self) {
        while !self.cur_token_is(TokenKind::Semicolon)
            && !self.cur_token_is(TokenKind::Eof)
            && !self.peek_token_is(TokenKind::RBrace)
            && !self.peek_token_is(TokenKind::Eof)
        {
            self.next_token();
        }
    }
}
