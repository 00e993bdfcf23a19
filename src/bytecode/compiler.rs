//! Bytecode compiler: transforms the AST into instructions.
//!
//! Walks the tree once, appending encoded instructions to the current
//! scope's buffer. Forward jumps are emitted with a placeholder operand and
//! back-patched once their target is known.

use std::rc::Rc;

use crate::ast::{Block, Expr, ExprKind, Identifier, InfixOp, PrefixOp, Program, Stmt, StmtKind};
use crate::bytecode::chunk::{Chunk, CompiledFunction};
use crate::bytecode::instruction::{try_make, Instructions, Opcode};
use crate::bytecode::symbol_table::{Symbol, SymbolScope, SymbolTable};
use crate::error::CompileError;
use crate::span::Span;
use crate::value::Value;

pub type CompileResult<T> = Result<T, CompileError>;

const JUMP_PLACEHOLDER: usize = 0xFFFF;

/// Limits imposed by operand widths.
const MAX_CONSTANTS: usize = 1 << 16;
const MAX_GLOBALS: usize = 1 << 16;
const MAX_LOCALS: usize = 1 << 8;
const MAX_ARGUMENTS: usize = u8::MAX as usize;
const MAX_ELEMENTS: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

/// Instruction buffer of the function body being compiled.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
}

/// A jump emitted with a placeholder target.
#[derive(Debug, Clone, Copy)]
#[must_use]
struct JumpPatch {
    position: usize,
}

/// Compiles a [`Program`] into a [`Chunk`].
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    pub fn new() -> Self {
        Self::with_state(SymbolTable::new(), Vec::new())
    }

    /// Continue from the globals and constants of an earlier compilation.
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Self {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }

        tracing::debug!(
            instructions = self.current_scope().instructions.len(),
            constants = self.constants.len(),
            globals = self.symbol_table.num_definitions(),
            "compiled program"
        );
        Ok(())
    }

    /// The compiled top-level stream and the constant pool.
    pub fn bytecode(&self) -> Chunk {
        Chunk::new(
            self.current_scope().instructions.clone(),
            self.constants.clone(),
        )
    }

    /// Hand back the state needed to compile a follow-up program.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[])?;
            }

            StmtKind::Let { name, value } => {
                // Defined before the value so a function can refer to itself
                let symbol = self.define(name)?;
                match &value.kind {
                    ExprKind::Function { parameters, body } => {
                        self.compile_function(parameters, body, Some(&name.name))?
                    }
                    _ => self.compile_expression(value)?,
                }
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index])?,
                    SymbolScope::Local => self.emit(Opcode::SetLocal, &[symbol.index])?,
                };
            }

            StmtKind::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[])?;
            }

            StmtKind::Block(block) => self.compile_block(block)?,
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::Integer(n) => {
                let index = self.add_constant(Value::Integer(*n))?;
                self.emit(Opcode::Constant, &[index])?;
            }

            ExprKind::String(s) => {
                let index = self.add_constant(Value::string(s))?;
                self.emit(Opcode::Constant, &[index])?;
            }

            ExprKind::Boolean(true) => {
                self.emit(Opcode::True, &[])?;
            }
            ExprKind::Boolean(false) => {
                self.emit(Opcode::False, &[])?;
            }

            ExprKind::Identifier(ident) => {
                let symbol = self
                    .symbol_table
                    .resolve(&ident.name)
                    .ok_or_else(|| CompileError::undefined_variable(&ident.name, expr.span()))?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index])?,
                    SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index])?,
                };
            }

            ExprKind::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOp::Minus => self.emit(Opcode::Minus, &[])?,
                    PrefixOp::Bang => self.emit(Opcode::Bang, &[])?,
                };
            }

            ExprKind::Infix {
                left,
                operator,
                right,
            } => {
                // a < b is compiled as b > a
                let (first, second) = match operator {
                    InfixOp::Lt => (right, left),
                    _ => (left, right),
                };
                self.compile_expression(first)?;
                self.compile_expression(second)?;

                let opcode = match operator {
                    InfixOp::Plus => Opcode::Add,
                    InfixOp::Minus => Opcode::Sub,
                    InfixOp::Multiply => Opcode::Mul,
                    InfixOp::Divide => Opcode::Div,
                    InfixOp::Gt | InfixOp::Lt => Opcode::GreaterThan,
                    InfixOp::Eq => Opcode::Equal,
                    InfixOp::NotEq => Opcode::NotEqual,
                };
                self.emit(opcode, &[])?;
            }

            ExprKind::If {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;
                let jump_not_truthy = self.emit_jump(Opcode::JumpNotTruthy)?;

                self.compile_block_value(consequence)?;
                let jump = self.emit_jump(Opcode::Jump)?;

                let after_consequence = self.current_offset();
                self.patch_jump(jump_not_truthy, after_consequence)?;

                match alternative {
                    Some(alternative) => self.compile_block_value(alternative)?,
                    None => {
                        self.emit(Opcode::Null, &[])?;
                    }
                }

                let after_alternative = self.current_offset();
                self.patch_jump(jump, after_alternative)?;
            }

            ExprKind::Function { parameters, body } => {
                self.compile_function(parameters, body, None)?;
            }

            ExprKind::Call {
                function,
                arguments,
            } => {
                if arguments.len() > MAX_ARGUMENTS {
                    return Err(CompileError::TooManyArguments {
                        limit: MAX_ARGUMENTS,
                        span: expr.span(),
                    });
                }
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Opcode::Call, &[arguments.len()])?;
            }

            ExprKind::Array(elements) => {
                check_element_count(elements.len(), expr.span())?;
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Opcode::Array, &[elements.len()])?;
            }

            ExprKind::Hash(pairs) => {
                check_element_count(pairs.len() * 2, expr.span())?;
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[pairs.len() * 2])?;
            }

            ExprKind::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[])?;
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &Block) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    /// Compile a branch body so that it leaves exactly one value on the stack:
    /// the trailing expression's value, or null when the block ends in
    /// anything else.
    fn compile_block_value(&mut self, block: &Block) -> CompileResult<()> {
        self.compile_block(block)?;
        if self.last_instruction_is(Opcode::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(Opcode::Null, &[])?;
        }
        Ok(())
    }

    fn compile_function(
        &mut self,
        parameters: &[Identifier],
        body: &Block,
        name: Option<&str>,
    ) -> CompileResult<()> {
        self.enter_scope();

        let compiled = self.compile_function_body(parameters, body);
        let num_locals = self.symbol_table.num_definitions();
        let instructions = self.leave_scope();
        compiled?;

        tracing::debug!(
            name = name.unwrap_or("<anonymous>"),
            parameters = parameters.len(),
            locals = num_locals,
            bytes = instructions.len(),
            "compiled function"
        );

        let mut function = CompiledFunction::new(instructions, num_locals, parameters.len());
        function.name = name.map(str::to_string);

        let index = self.add_constant(Value::Function(Rc::new(function)))?;
        self.emit(Opcode::Constant, &[index])?;
        Ok(())
    }

    fn compile_function_body(&mut self, parameters: &[Identifier], body: &Block) -> CompileResult<()> {
        for parameter in parameters {
            self.define(parameter)?;
        }

        self.compile_block(body)?;

        if self.last_instruction_is(Opcode::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Opcode::ReturnValue) {
            self.emit(Opcode::Return, &[])?;
        }
        Ok(())
    }

    fn define(&mut self, ident: &Identifier) -> CompileResult<Symbol> {
        let symbol = self.symbol_table.define(&ident.name);
        let span = ident.token.span;
        match symbol.scope {
            SymbolScope::Global if symbol.index >= MAX_GLOBALS => Err(CompileError::TooManyGlobals {
                limit: MAX_GLOBALS,
                span,
            }),
            SymbolScope::Local if symbol.index >= MAX_LOCALS => Err(CompileError::TooManyLocals {
                limit: MAX_LOCALS,
                span,
            }),
            _ => Ok(symbol),
        }
    }

    // ===== Scopes =====

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().unwrap_or_default();
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table.into_outer().unwrap_or_default();
        scope.instructions
    }

    fn current_scope(&self) -> &CompilationScope {
        // The top-level scope is never popped
        &self.scopes[self.scopes.len() - 1]
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    // ===== Emission =====

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> CompileResult<usize> {
        let instruction = try_make(op, operands)?;
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend_from_slice(&instruction);

        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction {
            opcode: op,
            position,
        });

        tracing::trace!(position, op = op.name(), ?operands, "emit");
        Ok(position)
    }

    fn emit_jump(&mut self, op: Opcode) -> CompileResult<JumpPatch> {
        let position = self.emit(op, &[JUMP_PLACEHOLDER])?;
        Ok(JumpPatch { position })
    }

    /// Overwrite a placeholder jump operand with its real target.
    fn patch_jump(&mut self, patch: JumpPatch, target: usize) -> CompileResult<()> {
        if target > u16::MAX as usize {
            return Err(CompileError::JumpOutOfRange { offset: target });
        }

        let instructions = &mut self.current_scope_mut().instructions;
        let op = Opcode::try_from(instructions[patch.position])?;
        let encoded = try_make(op, &[target])?;
        instructions[patch.position..patch.position + encoded.len()].copy_from_slice(&encoded);
        Ok(())
    }

    fn current_offset(&self) -> usize {
        self.current_scope().instructions.len()
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        matches!(self.current_scope().last, Some(last) if last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last {
            scope.instructions.truncate(last.position);
            scope.last = scope.previous;
        }
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last.as_mut() {
            scope.instructions[last.position] = u8::from(Opcode::ReturnValue);
            last.opcode = Opcode::ReturnValue;
        }
    }

    fn add_constant(&mut self, value: Value) -> CompileResult<usize> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::TooManyConstants {
                limit: MAX_CONSTANTS,
            });
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn check_element_count(count: usize, span: Span) -> CompileResult<()> {
    if count > MAX_ELEMENTS {
        return Err(CompileError::TooManyElements {
            limit: MAX_ELEMENTS,
            span,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::instruction::make;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        let mut parser = Parser::from_source(source);
        let program = parser.parse_program();
        assert!(parser.errors().is_empty(), "{:?}", parser.errors());
        program
    }

    fn compile_source(source: &str) -> Chunk {
        let mut compiler = Compiler::new();
        compiler.compile(&parse(source)).unwrap();
        compiler.bytecode()
    }

    fn compile_error(source: &str) -> CompileError {
        Compiler::new().compile(&parse(source)).unwrap_err()
    }

    /// Compare through the disassembly so failures show readable listings.
    fn assert_instructions(expected: Vec<Vec<u8>>, actual: &Instructions) {
        assert_eq!(Instructions::concat(expected).to_string(), actual.to_string());
    }

    fn function_constant(chunk: &Chunk, index: usize) -> Rc<CompiledFunction> {
        match &chunk.constants[index] {
            Value::Function(function) => Rc::clone(function),
            other => panic!("constant {} is {:?}, not a function", index, other),
        }
    }

    #[test]
    fn test_integer_arithmetic() {
        let chunk = compile_source("1 + 2");
        assert_eq!(chunk.constants, vec![Value::Integer(1), Value::Integer(2)]);
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("1; 2");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Pop, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("-1 * 2 / 3 - 4");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Minus, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Mul, &[]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Div, &[]),
                make(Opcode::Constant, &[3]),
                make(Opcode::Sub, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_boolean_expressions() {
        let chunk = compile_source("!true == false");
        assert!(chunk.constants.is_empty());
        assert_instructions(
            vec![
                make(Opcode::True, &[]),
                make(Opcode::Bang, &[]),
                make(Opcode::False, &[]),
                make(Opcode::Equal, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("1 != 2");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::NotEqual, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_less_than_swaps_operands() {
        let chunk = compile_source("1 < 2");
        assert_eq!(chunk.constants, vec![Value::Integer(2), Value::Integer(1)]);
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::GreaterThan, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_conditionals() {
        let chunk = compile_source("if (true) { 10 }; 3333;");
        assert_instructions(
            vec![
                make(Opcode::True, &[]),
                make(Opcode::JumpNotTruthy, &[10]),
                make(Opcode::Constant, &[0]),
                make(Opcode::Jump, &[11]),
                make(Opcode::Null, &[]),
                make(Opcode::Pop, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("if (true) { 10 } else { 20 }; 3333;");
        assert_instructions(
            vec![
                make(Opcode::True, &[]),
                make(Opcode::JumpNotTruthy, &[10]),
                make(Opcode::Constant, &[0]),
                make(Opcode::Jump, &[13]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Pop, &[]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
        assert!(!chunk
            .instructions
            .windows(2)
            .any(|pair| pair == [0xFF, 0xFF]));
    }

    #[test]
    fn test_empty_branch_yields_null() {
        let chunk = compile_source("if (true) { }");
        assert_instructions(
            vec![
                make(Opcode::True, &[]),
                make(Opcode::JumpNotTruthy, &[8]),
                make(Opcode::Null, &[]),
                make(Opcode::Jump, &[9]),
                make(Opcode::Null, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_global_let_statements() {
        let chunk = compile_source("let one = 1; let two = 2;");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::SetGlobal, &[1]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("let one = 1; let two = one; two;");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::SetGlobal, &[1]),
                make(Opcode::GetGlobal, &[1]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_rebinding_reuses_global_slot() {
        let chunk = compile_source("let one = 1; let one = 2; one");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_string_expressions() {
        let chunk = compile_source(r#""mon" + "key""#);
        assert_eq!(chunk.constants, vec![Value::string("mon"), Value::string("key")]);
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_array_hash_and_index() {
        let chunk = compile_source("[]");
        assert_instructions(
            vec![make(Opcode::Array, &[0]), make(Opcode::Pop, &[])],
            &chunk.instructions,
        );

        let chunk = compile_source("{1: 2, 3: 4 * 5}");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Constant, &[3]),
                make(Opcode::Constant, &[4]),
                make(Opcode::Mul, &[]),
                make(Opcode::Hash, &[4]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("[1, 2][1]");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Array, &[2]),
                make(Opcode::Constant, &[2]),
                make(Opcode::Index, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_functions() {
        for source in ["fn() { return 5 + 10 }", "fn() { 5 + 10 }"] {
            let chunk = compile_source(source);
            let function = function_constant(&chunk, 2);
            assert_instructions(
                vec![
                    make(Opcode::Constant, &[0]),
                    make(Opcode::Constant, &[1]),
                    make(Opcode::Add, &[]),
                    make(Opcode::ReturnValue, &[]),
                ],
                &function.instructions,
            );
            assert_instructions(
                vec![make(Opcode::Constant, &[2]), make(Opcode::Pop, &[])],
                &chunk.instructions,
            );
        }

        let chunk = compile_source("fn() { 1; 2 }");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::Pop, &[]),
                make(Opcode::Constant, &[1]),
                make(Opcode::ReturnValue, &[]),
            ],
            &function_constant(&chunk, 2).instructions,
        );
    }

    #[test]
    fn test_function_without_value_returns_null() {
        let chunk = compile_source("fn() { }");
        assert_instructions(
            vec![make(Opcode::Return, &[])],
            &function_constant(&chunk, 0).instructions,
        );
    }

    #[test]
    fn test_calls() {
        let chunk = compile_source("fn() { 24 }();");
        assert_instructions(
            vec![
                make(Opcode::Constant, &[1]),
                make(Opcode::Call, &[0]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );

        let chunk = compile_source("let oneArg = fn(a) { a }; oneArg(24);");
        let function = function_constant(&chunk, 0);
        assert_eq!(function.num_parameters, 1);
        assert_eq!(function.name.as_deref(), Some("oneArg"));
        assert_instructions(
            vec![make(Opcode::GetLocal, &[0]), make(Opcode::ReturnValue, &[])],
            &function.instructions,
        );
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetGlobal, &[0]),
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Call, &[1]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }

    #[test]
    fn test_local_and_global_bindings_in_functions() {
        let chunk = compile_source("let num = 55; fn() { num }");
        assert_instructions(
            vec![make(Opcode::GetGlobal, &[0]), make(Opcode::ReturnValue, &[])],
            &function_constant(&chunk, 1).instructions,
        );

        let chunk = compile_source("fn() { let a = 55; let b = 77; a + b }");
        let function = function_constant(&chunk, 2);
        assert_eq!(function.num_locals, 2);
        assert_instructions(
            vec![
                make(Opcode::Constant, &[0]),
                make(Opcode::SetLocal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::SetLocal, &[1]),
                make(Opcode::GetLocal, &[0]),
                make(Opcode::GetLocal, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::ReturnValue, &[]),
            ],
            &function.instructions,
        );
    }

    #[test]
    fn test_undefined_variable() {
        assert_eq!(compile_error("x").to_string(), "undefined variable x");
        // No closures: an enclosing function's parameter is not visible
        assert!(matches!(
            compile_error("fn(a) { fn() { a } }"),
            CompileError::UndefinedVariable { ref name, .. } if name == "a"
        ));
    }

    #[test]
    fn test_state_carries_over() {
        let mut compiler = Compiler::new();
        compiler.compile(&parse("let a = 1;")).unwrap();
        let (symbols, constants) = compiler.into_state();

        let mut compiler = Compiler::with_state(symbols, constants);
        compiler.compile(&parse("a + 2")).unwrap();
        let chunk = compiler.bytecode();
        assert_eq!(chunk.constants.len(), 2);
        assert_instructions(
            vec![
                make(Opcode::GetGlobal, &[0]),
                make(Opcode::Constant, &[1]),
                make(Opcode::Add, &[]),
                make(Opcode::Pop, &[]),
            ],
            &chunk.instructions,
        );
    }
}
