//! Bytecode disassembler for debugging.
//!
//! Each instruction renders as `OFFSET NAME [OPERAND]`, with the byte offset
//! zero-padded to four digits.

use std::fmt::{self, Write};

use crate::bytecode::chunk::Chunk;
use crate::bytecode::instruction::{lookup, read_operands, Definition};
use crate::value::Value;

/// Disassemble a raw instruction stream.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_instructions(&mut output, bytes);
    output
}

/// Disassemble a compiled program: the main stream, the constant pool and
/// the body of every function constant.
pub fn disassemble_program(chunk: &Chunk) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = write_program(&mut output, chunk);
    output
}

fn write_program(out: &mut String, chunk: &Chunk) -> fmt::Result {
    writeln!(out, "== main ==")?;
    write_instructions(out, &chunk.instructions)?;

    if chunk.constants.is_empty() {
        return Ok(());
    }

    writeln!(out, "\n== constants ==")?;
    for (index, constant) in chunk.constants.iter().enumerate() {
        match constant {
            Value::String(s) => writeln!(out, "{:04} {} {:?}", index, constant.type_name(), s)?,
            _ => writeln!(out, "{:04} {} {}", index, constant.type_name(), constant)?,
        }
    }

    for (index, constant) in chunk.constants.iter().enumerate() {
        if let Value::Function(function) = constant {
            writeln!(
                out,
                "\n== constant {} {} (params: {}, locals: {}) ==",
                index,
                function.name.as_deref().unwrap_or("<anonymous>"),
                function.num_parameters,
                function.num_locals
            )?;
            write_instructions(out, &function.instructions)?;
        }
    }

    Ok(())
}

/// Write one line per instruction.
///
/// An undefined opcode byte produces an `ERROR:` line and disassembly resumes
/// at the next byte. A truncated final instruction ends the listing.
pub fn write_instructions<W: Write>(out: &mut W, bytes: &[u8]) -> fmt::Result {
    let mut offset = 0;

    while offset < bytes.len() {
        let definition = match lookup(bytes[offset]) {
            Ok(definition) => definition,
            Err(err) => {
                writeln!(out, "ERROR: {}", err)?;
                offset += 1;
                continue;
            }
        };

        match read_operands(definition, &bytes[offset + 1..]) {
            Ok((operands, read)) => {
                writeln!(out, "{:04} {}", offset, fmt_instruction(definition, &operands))?;
                offset += 1 + read;
            }
            Err(err) => {
                writeln!(out, "{:04} ERROR: {}", offset, err)?;
                break;
            }
        }
    }

    Ok(())
}

fn fmt_instruction(definition: &Definition, operands: &[usize]) -> String {
    let operand_count = definition.operand_widths.len();

    if operands.len() != operand_count {
        return format!(
            "ERROR: operand len {} does not match defined {}",
            operands.len(),
            operand_count
        );
    }

    match operands {
        [] => definition.name.to_string(),
        [operand] => format!("{} {}", definition.name, operand),
        _ => format!("ERROR: unhandled operandCount for {}", definition.name),
    }
}
