//! Statement AST nodes.

use std::fmt;

use crate::ast::expr::{Expr, Identifier};
use crate::ast::Node;
use crate::lexer::Token;
use crate::span::Span;

/// A statement in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub token: Token,
}

impl Stmt {
    pub fn new(kind: StmtKind, token: Token) -> Self {
        Self { kind, token }
    }

    pub fn span(&self) -> Span {
        self.token.span
    }
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// let name = value;
    Let { name: Identifier, value: Expr },

    /// return value;
    Return(Expr),

    /// A bare expression; its value is discarded.
    Expression(Expr),

    Block(Block),
}

/// `{ ... }` body of an `if` branch or a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub token: Token,
}

impl Block {
    pub fn new(statements: Vec<Stmt>, token: Token) -> Self {
        Self { statements, token }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// The root node: every top-level statement in order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

impl Node for Stmt {
    fn token_literal(&self) -> &str {
        &self.token.literal
    }
}

impl Node for Block {
    fn token_literal(&self) -> &str {
        &self.token.literal
    }
}

impl Node for Program {
    fn token_literal(&self) -> &str {
        self.statements
            .first()
            .map(|stmt| stmt.token_literal())
            .unwrap_or("")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::Let { name, value } => {
                write!(f, "{} {} = {};", self.token.literal, name, value)
            }
            StmtKind::Return(value) => write!(f, "{} {};", self.token.literal, value),
            StmtKind::Expression(expr) => write!(f, "{}", expr),
            StmtKind::Block(block) => write!(f, "{}", block),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;
    use crate::lexer::TokenKind;

    fn token(kind: TokenKind, literal: &str) -> Token {
        Token::new(kind, literal, Span::default())
    }

    fn ident(name: &str) -> Identifier {
        Identifier::new(token(TokenKind::Ident, name))
    }

    #[test]
    fn test_program_string() {
        let program = Program::new(vec![Stmt::new(
            StmtKind::Let {
                name: ident("myVar"),
                value: Expr::new(
                    ExprKind::Identifier(ident("anotherVar")),
                    token(TokenKind::Ident, "anotherVar"),
                ),
            },
            token(TokenKind::Let, "let"),
        )]);

        assert_eq!(program.to_string(), "let myVar = anotherVar;");
        assert_eq!(program.token_literal(), "let");
    }

    #[test]
    fn test_empty_program_literal() {
        assert_eq!(Program::default().token_literal(), "");
    }
}
