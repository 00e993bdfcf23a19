//! Compiled program and function representations.

use std::rc::Rc;

use crate::bytecode::instruction::Instructions;
use crate::value::Value;

/// Compiler output: the top-level instruction stream and the constant pool
/// shared by it and every function it defines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new(instructions: Instructions, constants: Vec<Value>) -> Self {
        Self {
            instructions,
            constants,
        }
    }
}

/// A function body compiled to its own instruction stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Local slots the frame reserves, parameters included.
    pub num_locals: usize,
    pub num_parameters: usize,
    /// Name of the binding the literal was assigned to, when there is one.
    pub name: Option<String>,
}

impl CompiledFunction {
    pub fn new(instructions: Instructions, num_locals: usize, num_parameters: usize) -> Self {
        Self {
            instructions,
            num_locals,
            num_parameters,
            name: None,
        }
    }

    /// Wrap a top-level instruction stream so the VM can run it as the main frame.
    pub fn main(instructions: Instructions) -> Rc<Self> {
        Rc::new(Self::new(instructions, 0, 0))
    }
}
