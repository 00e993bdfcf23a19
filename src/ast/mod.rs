//! Abstract Syntax Tree for Monkey.
//!
//! Every node keeps the token it was parsed from, so diagnostics can point at
//! source and [`Node::token_literal`] can report the literal text. `Display`
//! renders the canonical parenthesized form used throughout the tests.

pub mod expr;
pub mod stmt;

pub use expr::{Expr, ExprKind, Identifier, InfixOp, PrefixOp};
pub use stmt::{Block, Program, Stmt, StmtKind};

/// Capabilities shared by every AST node.
pub trait Node: std::fmt::Display {
    /// The literal text of the token the node starts with.
    fn token_literal(&self) -> &str;
}
