//! Expression AST nodes.

use std::fmt;

use crate::ast::stmt::Block;
use crate::ast::Node;
use crate::lexer::Token;
use crate::span::Span;

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub token: Token,
}

impl Expr {
    pub fn new(kind: ExprKind, token: Token) -> Self {
        Self { kind, token }
    }

    pub fn span(&self) -> Span {
        self.token.span
    }
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(Identifier),
    Integer(i64),
    Boolean(bool),
    String(String),

    /// Prefix operation: -x, !x
    Prefix {
        operator: PrefixOp,
        right: Box<Expr>,
    },

    /// Infix operation: a + b
    Infix {
        left: Box<Expr>,
        operator: InfixOp,
        right: Box<Expr>,
    },

    /// if (cond) { ... } else { ... }
    If {
        condition: Box<Expr>,
        consequence: Block,
        alternative: Option<Block>,
    },

    /// fn(a, b) { ... }
    Function {
        parameters: Vec<Identifier>,
        body: Block,
    },

    /// callee(args)
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },

    /// [a, b, c]
    Array(Vec<Expr>),

    /// {key: value, ...} in source order
    Hash(Vec<(Expr, Expr)>),

    /// collection[index]
    Index { left: Box<Expr>, index: Box<Expr> },
}

/// A name, either referenced or bound.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub token: Token,
}

impl Identifier {
    pub fn new(token: Token) -> Self {
        Self {
            name: token.literal.clone(),
            token,
        }
    }
}

/// Prefix (unary) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Minus,
    Bang,
}

/// Infix (binary) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Lt,
    Gt,
    Eq,
    NotEq,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Minus => write!(f, "-"),
            PrefixOp::Bang => write!(f, "!"),
        }
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
        };
        f.write_str(op)
    }
}

impl Node for Expr {
    fn token_literal(&self) -> &str {
        &self.token.literal
    }
}

impl Node for Identifier {
    fn token_literal(&self) -> &str {
        &self.token.literal
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(ident) => write!(f, "{}", ident),
            // Literals print exactly as written
            ExprKind::Integer(_) | ExprKind::Boolean(_) | ExprKind::String(_) => {
                f.write_str(&self.token.literal)
            }
            ExprKind::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            ExprKind::Infix {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator, right),
            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, "else {}", alternative)?;
                }
                Ok(())
            }
            ExprKind::Function { parameters, body } => {
                write!(f, "{}(", self.token.literal)?;
                write_joined(f, parameters)?;
                write!(f, ") {}", body)
            }
            ExprKind::Call {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;
                write_joined(f, arguments)?;
                write!(f, ")")
            }
            ExprKind::Array(elements) => {
                write!(f, "[")?;
                write_joined(f, elements)?;
                write!(f, "]")
            }
            ExprKind::Hash(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                write!(f, "}}")
            }
            ExprKind::Index { left, index } => write!(f, "({}[{}])", left, index),
        }
    }
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}
