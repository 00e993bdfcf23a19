//! Bytecode compiler and virtual machine for Monkey.
//!
//! # Architecture
//!
//! - `instruction`: opcode definitions and the operand encoding
//! - `chunk`: compiled programs and functions
//! - `symbol_table`: name to slot resolution for globals and locals
//! - `compiler`: transforms the AST into bytecode
//! - `vm`: stack-based virtual machine for executing bytecode
//! - `disassembler`: debug output for bytecode inspection

pub mod chunk;
pub mod compiler;
pub mod disassembler;
pub mod instruction;
pub mod symbol_table;
pub mod vm;

pub use chunk::{Chunk, CompiledFunction};
pub use compiler::Compiler;
pub use disassembler::{disassemble, disassemble_program};
pub use instruction::{lookup, make, read_operands, Definition, Instructions, Opcode};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use vm::Vm;
