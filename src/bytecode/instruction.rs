//! Bytecode instruction definitions for the Monkey VM.
//!
//! An instruction is one opcode byte followed by its operands, each a
//! fixed-width big-endian unsigned integer. Widths come from the opcode's
//! [`Definition`].

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::bytecode::disassembler;
use crate::error::InstructionError;

/// Opcodes for the bytecode virtual machine.
///
/// Byte values are part of the encoded format and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Push a constant: CONSTANT <index:u16>
    Constant = 0,
    Add,
    Pop,
    Sub,
    Mul,
    Div,
    True,
    False,
    Equal,
    NotEqual,
    GreaterThan,
    Minus,
    Bang,
    /// Pop a condition and jump when it is falsy: JUMP_NOT_TRUTHY <addr:u16>
    JumpNotTruthy,
    /// JUMP <addr:u16>
    Jump,
    Null,
    /// GET_GLOBAL <slot:u16>
    GetGlobal,
    /// SET_GLOBAL <slot:u16>
    SetGlobal,
    /// Build an array from the top <count:u16> values
    Array,
    /// Build a hash from the top <count:u16> values (keys and values interleaved)
    Hash,
    Index,
    /// CALL <argc:u8>
    Call,
    ReturnValue,
    Return,
    /// GET_LOCAL <slot:u8>, relative to the frame's base pointer
    GetLocal,
    /// SET_LOCAL <slot:u8>
    SetLocal,
}

/// Name and operand layout of an opcode.
#[derive(Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: &'static str,
    pub operand_widths: &'static [usize],
}

impl Definition {
    /// Total operand bytes following the opcode byte.
    pub fn operand_len(&self) -> usize {
        self.operand_widths.iter().sum()
    }
}

const fn def(name: &'static str, operand_widths: &'static [usize]) -> Definition {
    Definition {
        name,
        operand_widths,
    }
}

/// Indexed by opcode byte.
static DEFINITIONS: [Definition; 26] = [
    def("OpConstant", &[2]),
    def("OpAdd", &[]),
    def("OpPop", &[]),
    def("OpSub", &[]),
    def("OpMul", &[]),
    def("OpDiv", &[]),
    def("OpTrue", &[]),
    def("OpFalse", &[]),
    def("OpEqual", &[]),
    def("OpNotEqual", &[]),
    def("OpGreaterThan", &[]),
    def("OpMinus", &[]),
    def("OpBang", &[]),
    def("OpJumpNotTruthy", &[2]),
    def("OpJump", &[2]),
    def("OpNull", &[]),
    def("OpGetGlobal", &[2]),
    def("OpSetGlobal", &[2]),
    def("OpArray", &[2]),
    def("OpHash", &[2]),
    def("OpIndex", &[]),
    def("OpCall", &[1]),
    def("OpReturnValue", &[]),
    def("OpReturn", &[]),
    def("OpGetLocal", &[1]),
    def("OpSetLocal", &[1]),
];

/// Indexed by opcode byte.
const OPCODES: [Opcode; 26] = [
    Opcode::Constant,
    Opcode::Add,
    Opcode::Pop,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::True,
    Opcode::False,
    Opcode::Equal,
    Opcode::NotEqual,
    Opcode::GreaterThan,
    Opcode::Minus,
    Opcode::Bang,
    Opcode::JumpNotTruthy,
    Opcode::Jump,
    Opcode::Null,
    Opcode::GetGlobal,
    Opcode::SetGlobal,
    Opcode::Array,
    Opcode::Hash,
    Opcode::Index,
    Opcode::Call,
    Opcode::ReturnValue,
    Opcode::Return,
    Opcode::GetLocal,
    Opcode::SetLocal,
];

impl Opcode {
    pub fn definition(self) -> &'static Definition {
        &DEFINITIONS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn from_u8(byte: u8) -> Option<Opcode> {
        OPCODES.get(byte as usize).copied()
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> u8 {
        op as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = InstructionError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::from_u8(byte).ok_or(InstructionError::UndefinedOpcode(byte))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up the definition for a raw opcode byte.
pub fn lookup(byte: u8) -> Result<&'static Definition, InstructionError> {
    Opcode::try_from(byte).map(Opcode::definition)
}

/// Encode one instruction. Returns an empty sequence when the operands do not
/// match the opcode's definition; use [`try_make`] to learn why.
pub fn make(op: Opcode, operands: &[usize]) -> Vec<u8> {
    try_make(op, operands).unwrap_or_default()
}

/// Encode one instruction, rejecting a wrong operand count or an operand too
/// large for its width.
pub fn try_make(op: Opcode, operands: &[usize]) -> Result<Vec<u8>, InstructionError> {
    let definition = op.definition();

    if operands.len() != definition.operand_widths.len() {
        return Err(InstructionError::OperandCount {
            name: definition.name,
            expected: definition.operand_widths.len(),
            got: operands.len(),
        });
    }

    let mut instruction = Vec::with_capacity(1 + definition.operand_len());
    instruction.push(u8::from(op));

    for (&operand, &width) in operands.iter().zip(definition.operand_widths) {
        if !fits(operand, width) {
            return Err(InstructionError::OperandTooWide {
                name: definition.name,
                operand,
                width,
            });
        }
        for shift in (0..width).rev() {
            let byte = operand.checked_shr(8 * shift as u32).unwrap_or(0);
            instruction.push(byte as u8);
        }
    }

    Ok(instruction)
}

fn fits(operand: usize, width: usize) -> bool {
    width >= std::mem::size_of::<usize>() || operand >> (8 * width) == 0
}

/// Decode the operands that follow an opcode byte. Inverse of [`make`]:
/// returns the operand values and the number of bytes they occupied.
pub fn read_operands(
    definition: &Definition,
    bytes: &[u8],
) -> Result<(Vec<usize>, usize), InstructionError> {
    let needed = definition.operand_len();
    if bytes.len() < needed {
        return Err(InstructionError::Truncated {
            name: definition.name,
            needed,
            available: bytes.len(),
        });
    }

    let mut operands = Vec::with_capacity(definition.operand_widths.len());
    let mut offset = 0;

    for &width in definition.operand_widths {
        operands.push(read_uint(&bytes[offset..offset + width]));
        offset += width;
    }

    Ok((operands, offset))
}

/// Big-endian unsigned integer spanning all of `bytes`.
pub fn read_uint(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .fold(0usize, |acc, &byte| (acc << 8) | byte as usize)
}

/// Big-endian `u16` from the first two bytes; `None` if fewer remain.
pub fn read_u16(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

pub fn read_u8(bytes: &[u8]) -> Option<u8> {
    bytes.first().copied()
}

/// A contiguous instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Concatenate encoded instructions into one stream.
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self(parts.into_iter().flatten().collect())
    }

}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Deref for Instructions {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Instructions {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl fmt::Display for Instructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        disassembler::write_instructions(f, &self.0)
    }
}
