//! Operator precedence for Pratt parsing.

use crate::lexer::TokenKind;

/// Binding power levels (higher = tighter binding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest = 1,
    Equals = 2,      // == !=
    LessGreater = 3, // < >
    Sum = 4,         // + -
    Product = 5,     // * /
    Prefix = 6,      // -x !x
    Call = 7,        // f(x) a[i]
}

/// Infix binding power of a token; `Lowest` for tokens with no infix rule.
pub fn get_precedence(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
        TokenKind::LParen | TokenKind::LBracket => Precedence::Call,
        _ => Precedence::Lowest,
    }
}
