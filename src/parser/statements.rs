//! Statement parsing.

use crate::ast::{Block, Identifier, Stmt, StmtKind};
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::Precedence;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    /// let <identifier> = <expression>;
    fn parse_let_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.cur_token.clone();

        self.expect_peek(TokenKind::Ident)?;
        let name = Identifier::new(self.cur_token.clone());

        self.expect_peek(TokenKind::Assign)?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Some(Stmt::new(StmtKind::Let { name, value }, token))
    }

    /// return <expression>;
    fn parse_return_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.cur_token.clone();
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Some(Stmt::new(StmtKind::Return(value), token))
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Stmt> {
        let token = self.cur_token.clone();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_optional_semicolon();

        Some(Stmt::new(StmtKind::Expression(expr), token))
    }

    /// Parse `{ ... }` starting on the `{`; leaves `}` as the current token.
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let token = self.cur_token.clone();
        let mut statements = Vec::new();

        self.next_token();

        while !self.cur_token_is(TokenKind::RBrace) && !self.cur_token_is(TokenKind::Eof) {
            match self.parse_statement() {
                Some(stmt) => statements.push(stmt),
                None => self.synchronize(),
            }
            self.next_token();
        }

        if self.cur_token_is(TokenKind::Eof) {
            self.record(ParserError::unexpected_token(
                TokenKind::RBrace,
                TokenKind::Eof,
                self.cur_token.span,
            ));
            return None;
        }

        Some(Block::new(statements, token))
    }

    fn skip_optional_semicolon(&mut self) {
        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
    }
}
