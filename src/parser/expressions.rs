//! Expression parsing with Pratt-style precedence climbing.
//!
//! Prefix and infix rules are dispatched by matching on the token kind
//! rather than through registered function tables.

use crate::ast::{Expr, ExprKind, Identifier, InfixOp, PrefixOp};
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::Precedence;

impl<'a> Parser<'a> {
    /// Parse an expression whose infix operators all bind tighter than `precedence`.
    pub(crate) fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.peek_token_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            self.next_token();
            left = self.parse_infix(left)?;
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        match self.cur_token.kind {
            TokenKind::Ident => Some(self.parse_identifier()),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::String => Some(Expr::new(
                ExprKind::String(self.cur_token.literal.clone()),
                self.cur_token.clone(),
            )),
            TokenKind::True | TokenKind::False => Some(Expr::new(
                ExprKind::Boolean(self.cur_token_is(TokenKind::True)),
                self.cur_token.clone(),
            )),
            TokenKind::Bang => self.parse_prefix_expression(PrefixOp::Bang),
            TokenKind::Minus => self.parse_prefix_expression(PrefixOp::Minus),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            kind => {
                self.record(ParserError::no_prefix_parse(kind, self.cur_token.span));
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expr) -> ParseResult<Expr> {
        let operator = match self.cur_token.kind {
            TokenKind::Plus => InfixOp::Plus,
            TokenKind::Minus => InfixOp::Minus,
            TokenKind::Asterisk => InfixOp::Multiply,
            TokenKind::Slash => InfixOp::Divide,
            TokenKind::Lt => InfixOp::Lt,
            TokenKind::Gt => InfixOp::Gt,
            TokenKind::Eq => InfixOp::Eq,
            TokenKind::NotEq => InfixOp::NotEq,
            TokenKind::LParen => return self.parse_call_expression(left),
            TokenKind::LBracket => return self.parse_index_expression(left),
            _ => return Some(left),
        };

        let token = self.cur_token.clone();
        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expr::new(
            ExprKind::Infix {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
            token,
        ))
    }

    fn parse_identifier(&self) -> Expr {
        Expr::new(
            ExprKind::Identifier(Identifier::new(self.cur_token.clone())),
            self.cur_token.clone(),
        )
    }

    fn parse_integer_literal(&mut self) -> ParseResult<Expr> {
        let token = self.cur_token.clone();
        match token.literal.parse::<i64>() {
            Ok(value) => Some(Expr::new(ExprKind::Integer(value), token)),
            Err(_) => {
                self.record(ParserError::invalid_integer(&token.literal, token.span));
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self, operator: PrefixOp) -> ParseResult<Expr> {
        let token = self.cur_token.clone();
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expr::new(
            ExprKind::Prefix {
                operator,
                right: Box::new(right),
            },
            token,
        ))
    }

    fn parse_grouped_expression(&mut self) -> ParseResult<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;
        Some(expr)
    }

    /// if (<condition>) { ... } else { ... }
    fn parse_if_expression(&mut self) -> ParseResult<Expr> {
        let token = self.cur_token.clone();

        self.expect_peek(TokenKind::LParen)?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RParen)?;

        self.expect_peek(TokenKind::LBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_token_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek(TokenKind::LBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Some(Expr::new(
            ExprKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            token,
        ))
    }

    /// fn(<parameters>) { ... }
    fn parse_function_literal(&mut self) -> ParseResult<Expr> {
        let token = self.cur_token.clone();

        self.expect_peek(TokenKind::LParen)?;
        let parameters = self.parse_function_parameters()?;

        self.expect_peek(TokenKind::LBrace)?;
        let body = self.parse_block()?;

        Some(Expr::new(ExprKind::Function { parameters, body }, token))
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<Identifier>> {
        let mut parameters = Vec::new();

        if self.peek_token_is(TokenKind::RParen) {
            self.next_token();
            return Some(parameters);
        }

        self.expect_peek(TokenKind::Ident)?;
        parameters.push(Identifier::new(self.cur_token.clone()));

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Ident)?;
            parameters.push(Identifier::new(self.cur_token.clone()));
        }

        self.expect_peek(TokenKind::RParen)?;
        Some(parameters)
    }

    fn parse_call_expression(&mut self, function: Expr) -> ParseResult<Expr> {
        let token = self.cur_token.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;

        Some(Expr::new(
            ExprKind::Call {
                function: Box::new(function),
                arguments,
            },
            token,
        ))
    }

    fn parse_index_expression(&mut self, left: Expr) -> ParseResult<Expr> {
        let token = self.cur_token.clone();
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(TokenKind::RBracket)?;

        Some(Expr::new(
            ExprKind::Index {
                left: Box::new(left),
                index: Box::new(index),
            },
            token,
        ))
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let token = self.cur_token.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expr::new(ExprKind::Array(elements), token))
    }

    /// {<key>: <value>, ...}
    fn parse_hash_literal(&mut self) -> ParseResult<Expr> {
        let token = self.cur_token.clone();
        let mut pairs = Vec::new();

        while !self.peek_token_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            self.expect_peek(TokenKind::Colon)?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            if !self.peek_token_is(TokenKind::RBrace) {
                self.expect_peek(TokenKind::Comma)?;
            }
        }

        self.expect_peek(TokenKind::RBrace)?;
        Some(Expr::new(ExprKind::Hash(pairs), token))
    }

    /// Comma-separated expressions up to `end`, starting on the opening token.
    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();

        if self.peek_token_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Some(list)
    }
}
