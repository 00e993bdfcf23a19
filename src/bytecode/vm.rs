//! Stack-based virtual machine for executing bytecode.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::bytecode::chunk::{Chunk, CompiledFunction};
use crate::bytecode::instruction::{read_uint, Opcode};
use crate::config::VmConfig;
use crate::error::{InstructionError, RuntimeError, RuntimeErrorKind};
use crate::value::{HashKey, Value};

/// Result type for VM operations.
pub type VmResult<T> = Result<T, RuntimeError>;

type ExecResult<T> = Result<T, RuntimeErrorKind>;

/// A call frame representing a function invocation.
#[derive(Debug, Clone)]
struct Frame {
    function: Rc<CompiledFunction>,
    /// Offset of the next instruction to decode
    ip: usize,
    /// Stack slot of the first argument; locals are addressed from here
    base_pointer: usize,
}

/// The virtual machine. One instance runs one compiled program.
pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    /// Next free slot. `stack[sp]` holds the most recently popped value.
    sp: usize,
    globals: Vec<Option<Value>>,
    frames: Vec<Frame>,
    max_frames: usize,
}

impl Vm {
    pub fn new(chunk: Chunk) -> Self {
        Self::with_config(chunk, &VmConfig::default())
    }

    pub fn with_config(chunk: Chunk, config: &VmConfig) -> Self {
        Self::with_globals(chunk, Vec::new(), config)
    }

    /// Start with globals left behind by an earlier run.
    pub fn with_globals(chunk: Chunk, mut globals: Vec<Option<Value>>, config: &VmConfig) -> Self {
        if globals.len() < config.globals_size {
            globals.resize(config.globals_size, None);
        }

        let main = Frame {
            function: CompiledFunction::main(chunk.instructions),
            ip: 0,
            base_pointer: 0,
        };

        Self {
            constants: chunk.constants,
            stack: vec![Value::Null; config.stack_size],
            sp: 0,
            globals,
            frames: vec![main],
            max_frames: config.max_frames,
        }
    }

    /// Execute until the main instruction stream is exhausted or returns.
    pub fn run(&mut self) -> VmResult<()> {
        while let Some(frame) = self.frames.last() {
            let ip = frame.ip;
            let instructions = &frame.function.instructions;

            if ip >= instructions.len() {
                if self.frames.len() == 1 {
                    self.frames.clear();
                    break;
                }
                self.return_from_frame(Value::Null)
                    .map_err(|kind| RuntimeError::new(kind, "<end>", ip))?;
                continue;
            }

            let op = Opcode::try_from(instructions[ip])
                .map_err(|err| RuntimeError::new(err.into(), "<undefined>", ip))?;

            let definition = op.definition();
            let width = definition.operand_len();
            let operand_bytes = instructions.get(ip + 1..ip + 1 + width).ok_or_else(|| {
                let kind = InstructionError::Truncated {
                    name: definition.name,
                    needed: width,
                    available: instructions.len() - ip - 1,
                };
                RuntimeError::new(kind.into(), op.name(), ip)
            })?;
            let operand = read_uint(operand_bytes);

            let last = self.frames.len() - 1;
            self.frames[last].ip = ip + 1 + width;

            tracing::trace!(ip, op = op.name(), operand, sp = self.sp, "exec");

            self.execute(op, operand)
                .map_err(|kind| RuntimeError::new(kind, op.name(), ip))?;
        }

        Ok(())
    }

    /// The value on top of the stack, if any.
    pub fn stack_top(&self) -> Option<&Value> {
        if self.sp == 0 {
            None
        } else {
            self.stack.get(self.sp - 1)
        }
    }

    /// The value most recently removed from the stack.
    pub fn last_popped_stack_elem(&self) -> Value {
        self.stack.get(self.sp).cloned().unwrap_or(Value::Null)
    }

    pub fn into_globals(self) -> Vec<Option<Value>> {
        self.globals
    }

    fn execute(&mut self, op: Opcode, operand: usize) -> ExecResult<()> {
        match op {
            Opcode::Constant => {
                let value = self
                    .constants
                    .get(operand)
                    .cloned()
                    .ok_or(RuntimeErrorKind::ConstantOutOfRange(operand))?;
                self.push(value)?;
            }

            Opcode::Pop => {
                self.pop()?;
            }

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => self.binary_op(op)?,

            Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => self.comparison_op(op)?,

            Opcode::True => self.push(Value::Boolean(true))?,
            Opcode::False => self.push(Value::Boolean(false))?,
            Opcode::Null => self.push(Value::Null)?,

            Opcode::Bang => {
                let value = self.pop()?;
                self.push(Value::Boolean(!value.is_truthy()))?;
            }

            Opcode::Minus => match self.pop()? {
                Value::Integer(n) => self.push(Value::Integer(n.wrapping_neg()))?,
                other => return Err(RuntimeErrorKind::UnsupportedNegation(other.type_name())),
            },

            Opcode::Jump => self.jump(operand),

            Opcode::JumpNotTruthy => {
                if !self.pop()?.is_truthy() {
                    self.jump(operand);
                }
            }

            Opcode::SetGlobal => {
                let value = self.pop()?;
                let slot = self
                    .globals
                    .get_mut(operand)
                    .ok_or(RuntimeErrorKind::GlobalOutOfRange(operand))?;
                *slot = Some(value);
            }

            Opcode::GetGlobal => {
                let value = match self.globals.get(operand) {
                    Some(Some(value)) => value.clone(),
                    Some(None) => return Err(RuntimeErrorKind::UnresolvedGlobal(operand)),
                    None => return Err(RuntimeErrorKind::GlobalOutOfRange(operand)),
                };
                self.push(value)?;
            }

            Opcode::SetLocal => {
                let value = self.pop()?;
                let slot = self.local_slot(operand)?;
                self.stack[slot] = value;
            }

            Opcode::GetLocal => {
                let slot = self.local_slot(operand)?;
                let value = self.stack[slot].clone();
                self.push(value)?;
            }

            Opcode::Array => {
                let elements = self.pop_many(operand)?;
                self.push(Value::array(elements))?;
            }

            Opcode::Hash => {
                let hash = self.build_hash(operand)?;
                self.push(hash)?;
            }

            Opcode::Index => {
                let index = self.pop()?;
                let left = self.pop()?;
                self.push(index_value(&left, &index)?)?;
            }

            Opcode::Call => self.call_function(operand)?,

            Opcode::ReturnValue => {
                let value = self.pop()?;
                self.return_from_frame(value)?;
            }

            Opcode::Return => self.return_from_frame(Value::Null)?,
        }
        Ok(())
    }

    // ===== Stack =====

    fn push(&mut self, value: Value) -> ExecResult<()> {
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(RuntimeErrorKind::StackOverflow)?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    /// Pop leaves the value in its slot so it can be inspected afterwards.
    fn pop(&mut self) -> ExecResult<Value> {
        if self.sp == 0 {
            return Err(RuntimeErrorKind::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }

    /// Remove the top `count` values, returned in push order.
    fn pop_many(&mut self, count: usize) -> ExecResult<Vec<Value>> {
        if count > self.sp {
            return Err(RuntimeErrorKind::StackUnderflow);
        }
        let start = self.sp - count;
        let values = self.stack[start..self.sp].to_vec();
        self.sp = start;
        Ok(values)
    }

    fn local_slot(&self, index: usize) -> ExecResult<usize> {
        let frame = self.current_frame();
        if index >= frame.function.num_locals {
            return Err(RuntimeErrorKind::LocalOutOfRange(index));
        }
        Ok(frame.base_pointer + index)
    }

    fn current_frame(&self) -> &Frame {
        // run() only executes while a frame is active
        &self.frames[self.frames.len() - 1]
    }

    fn jump(&mut self, target: usize) {
        if let Some(frame) = self.frames.last_mut() {
            frame.ip = target;
        }
    }

    // ===== Operators =====

    fn binary_op(&mut self, op: Opcode) -> ExecResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => Value::Integer(integer_op(op, *a, *b)?),
            (Value::String(a), Value::String(b)) if op == Opcode::Add => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Value::String(Rc::from(joined))
            }
            _ => return Err(unsupported(op, &left, &right)),
        };

        self.push(result)
    }

    fn comparison_op(&mut self, op: Opcode) -> ExecResult<()> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match op {
            Opcode::Equal => left == right,
            Opcode::NotEqual => left != right,
            _ => match (&left, &right) {
                (Value::Integer(a), Value::Integer(b)) => a > b,
                _ => return Err(unsupported(op, &left, &right)),
            },
        };

        self.push(Value::Boolean(result))
    }

    fn build_hash(&mut self, count: usize) -> ExecResult<Value> {
        let values = self.pop_many(count)?;
        let mut pairs = IndexMap::with_capacity(values.len() / 2);

        for pair in values.chunks(2) {
            if let [key, value] = pair {
                let key = HashKey::from_value(key)
                    .ok_or(RuntimeErrorKind::UnusableHashKey(key.type_name()))?;
                pairs.insert(key, value.clone());
            }
        }

        Ok(Value::Hash(Rc::new(pairs)))
    }

    // ===== Calls =====

    fn call_function(&mut self, argc: usize) -> ExecResult<()> {
        if argc >= self.sp {
            return Err(RuntimeErrorKind::StackUnderflow);
        }

        let function = match &self.stack[self.sp - 1 - argc] {
            Value::Function(function) => Rc::clone(function),
            other => return Err(RuntimeErrorKind::NotCallable(other.type_name())),
        };

        if argc != function.num_parameters {
            return Err(RuntimeErrorKind::WrongArity {
                expected: function.num_parameters,
                got: argc,
            });
        }
        if self.frames.len() >= self.max_frames {
            return Err(RuntimeErrorKind::FrameOverflow(self.max_frames));
        }

        let base_pointer = self.sp - argc;
        let new_sp = base_pointer + function.num_locals.max(argc);
        if new_sp > self.stack.len() {
            return Err(RuntimeErrorKind::StackOverflow);
        }

        // Locals that are not parameters start out null
        for slot in &mut self.stack[base_pointer + argc..new_sp] {
            *slot = Value::Null;
        }
        self.sp = new_sp;

        tracing::debug!(
            function = function.name.as_deref().unwrap_or("<anonymous>"),
            argc,
            base_pointer,
            depth = self.frames.len() + 1,
            "push frame"
        );

        self.frames.push(Frame {
            function,
            ip: 0,
            base_pointer,
        });
        Ok(())
    }

    fn return_from_frame(&mut self, value: Value) -> ExecResult<()> {
        let frame = self.frames.pop().ok_or(RuntimeErrorKind::StackUnderflow)?;

        tracing::debug!(depth = self.frames.len(), result = %value, "pop frame");

        if self.frames.is_empty() {
            // Returning from the main program ends it
            self.sp = 0;
            if let Some(slot) = self.stack.first_mut() {
                *slot = value;
            }
            return Ok(());
        }

        // Drop the callee along with the frame's locals
        self.sp = frame.base_pointer.saturating_sub(1);
        self.push(value)
    }
}

fn integer_op(op: Opcode, a: i64, b: i64) -> ExecResult<i64> {
    match op {
        Opcode::Add => Ok(a.wrapping_add(b)),
        Opcode::Sub => Ok(a.wrapping_sub(b)),
        Opcode::Mul => Ok(a.wrapping_mul(b)),
        Opcode::Div if b == 0 => Err(RuntimeErrorKind::DivisionByZero),
        Opcode::Div => Ok(a.wrapping_div(b)),
        _ => Err(RuntimeErrorKind::UnsupportedBinary {
            operator: op.name(),
            left: "INTEGER",
            right: "INTEGER",
        }),
    }
}

/// Out-of-range array indexes and missing hash keys produce null.
fn index_value(left: &Value, index: &Value) -> ExecResult<Value> {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(Value::Null)),
        (Value::Hash(pairs), key) => {
            let key = HashKey::from_value(key)
                .ok_or(RuntimeErrorKind::UnusableHashKey(key.type_name()))?;
            Ok(pairs.get(&key).cloned().unwrap_or(Value::Null))
        }
        _ => Err(RuntimeErrorKind::IndexNotSupported {
            collection: left.type_name(),
            index: index.type_name(),
        }),
    }
}

fn unsupported(op: Opcode, left: &Value, right: &Value) -> RuntimeErrorKind {
    let operator = match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::Equal => "==",
        Opcode::NotEqual => "!=",
        Opcode::GreaterThan => ">",
        _ => op.name(),
    };
    RuntimeErrorKind::UnsupportedBinary {
        operator,
        left: left.type_name(),
        right: right.type_name(),
    }
}
