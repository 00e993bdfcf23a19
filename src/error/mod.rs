//! Error types for every phase: parsing, encoding, compilation and execution.

use std::fmt;

use crate::lexer::TokenKind;
use crate::span::Span;
use thiserror::Error;

/// Parser diagnostics. These are collected, never thrown mid-parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    #[error("expected next token to be {expected}, got {found} instead")]
    UnexpectedToken {
        expected: TokenKind,
        found: TokenKind,
        span: Span,
    },

    #[error("no prefix parse function for {kind} found")]
    NoPrefixParse { kind: TokenKind, span: Span },

    #[error("could not parse {literal:?} as integer")]
    InvalidInteger { literal: String, span: Span },
}

impl ParserError {
    pub fn unexpected_token(expected: TokenKind, found: TokenKind, span: Span) -> Self {
        Self::UnexpectedToken {
            expected,
            found,
            span,
        }
    }

    pub fn no_prefix_parse(kind: TokenKind, span: Span) -> Self {
        Self::NoPrefixParse { kind, span }
    }

    pub fn invalid_integer(literal: impl Into<String>, span: Span) -> Self {
        Self::InvalidInteger {
            literal: literal.into(),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::UnexpectedToken { span, .. } => *span,
            Self::NoPrefixParse { span, .. } => *span,
            Self::InvalidInteger { span, .. } => *span,
        }
    }
}

/// Every diagnostic from one parse, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseErrors(pub Vec<ParserError>);

impl ParseErrors {
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", error.span(), error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

/// Failures of the instruction encoder and decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("opcode {0} undefined")]
    UndefinedOpcode(u8),

    #[error("{name} expects {expected} operands, got {got}")]
    OperandCount {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("operand {operand} does not fit in {width} bytes for {name}")]
    OperandTooWide {
        name: &'static str,
        operand: usize,
        width: usize,
    },

    #[error("{name} needs {needed} operand bytes, only {available} remain")]
    Truncated {
        name: &'static str,
        needed: usize,
        available: usize,
    },
}

/// Bytecode compilation errors. Any of these aborts the compilation pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("undefined variable {name}")]
    UndefinedVariable { name: String, span: Span },

    #[error("too many constants (limit {limit})")]
    TooManyConstants { limit: usize },

    #[error("too many globals (limit {limit})")]
    TooManyGlobals { limit: usize, span: Span },

    #[error("too many locals (limit {limit})")]
    TooManyLocals { limit: usize, span: Span },

    #[error("too many arguments (limit {limit})")]
    TooManyArguments { limit: usize, span: Span },

    #[error("too many elements in literal (limit {limit})")]
    TooManyElements { limit: usize, span: Span },

    #[error("jump target {offset} out of range")]
    JumpOutOfRange { offset: usize },

    #[error("invalid instruction: {0}")]
    Instruction(#[from] InstructionError),
}

impl CompileError {
    pub fn undefined_variable(name: impl Into<String>, span: Span) -> Self {
        Self::UndefinedVariable {
            name: name.into(),
            span,
        }
    }

    /// Source location, when the error is tied to one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UndefinedVariable { span, .. }
            | Self::TooManyGlobals { span, .. }
            | Self::TooManyLocals { span, .. }
            | Self::TooManyArguments { span, .. }
            | Self::TooManyElements { span, .. } => Some(*span),
            Self::TooManyConstants { .. } | Self::JumpOutOfRange { .. } | Self::Instruction(_) => {
                None
            }
        }
    }
}

/// What went wrong inside the virtual machine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("call depth exceeded ({0} frames)")]
    FrameOverflow(usize),

    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error("global slot {0} read before assignment")]
    UnresolvedGlobal(usize),

    #[error("global slot {0} out of range")]
    GlobalOutOfRange(usize),

    #[error("local slot {0} out of range")]
    LocalOutOfRange(usize),

    #[error("constant index {0} out of range")]
    ConstantOutOfRange(usize),

    #[error("unsupported types for binary operation: {left} {operator} {right}")]
    UnsupportedBinary {
        operator: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("unsupported type for negation: {0}")]
    UnsupportedNegation(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("unusable as hash key: {0}")]
    UnusableHashKey(&'static str),

    #[error("index operator not supported: {collection}[{index}]")]
    IndexNotSupported {
        collection: &'static str,
        index: &'static str,
    },

    #[error("calling non-function: {0}")]
    NotCallable(&'static str),

    #[error("wrong number of arguments: want={expected}, got={got}")]
    WrongArity { expected: usize, got: usize },
}

/// A fatal VM error, located at the instruction that raised it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (at {opcode}, ip {ip})")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub opcode: &'static str,
    pub ip: usize,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, opcode: &'static str, ip: usize) -> Self {
        Self { kind, opcode, ip }
    }
}

/// Invalid resource limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("globals_size {0} exceeds the 2-byte slot operand limit of 65536")]
    GlobalsTooLarge(usize),
}

/// Unified error type for the whole pipeline.
#[derive(Debug, Error)]
pub enum SimianError {
    #[error("parse errors:\n{0}")]
    Parse(#[from] ParseErrors),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parser_messages() {
        let err = ParserError::unexpected_token(TokenKind::Assign, TokenKind::Int, Span::default());
        assert_eq!(err.to_string(), "expected next token to be =, got INT instead");

        let err = ParserError::invalid_integer("99999999999999999999", Span::default());
        assert_eq!(
            err.to_string(),
            "could not parse \"99999999999999999999\" as integer"
        );
    }

    #[test]
    fn test_runtime_error_carries_location() {
        let err = RuntimeError::new(RuntimeErrorKind::DivisionByZero, "OpDiv", 7);
        assert_eq!(err.to_string(), "division by zero (at OpDiv, ip 7)");
    }

    #[test]
    fn test_parse_errors_one_per_line() {
        let errors = ParseErrors(vec![
            ParserError::no_prefix_parse(TokenKind::Semicolon, Span::new(0, 1, 1, 1)),
            ParserError::no_prefix_parse(TokenKind::RBrace, Span::new(4, 5, 2, 1)),
        ]);
        assert_eq!(
            errors.to_string(),
            "1:1: no prefix parse function for ; found\n2:1: no prefix parse function for } found"
        );
    }
}
