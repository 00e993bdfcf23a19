//! Pratt parser for Monkey.

mod core;
mod expressions;
mod precedence;
mod statements;


pub use self::core::Parser;
pub use self::precedence::Precedence;
