//! Simian: a bytecode compiler and virtual machine for the Monkey language.
//!
//! Source text flows through the [`lexer`], the Pratt [`parser`], the
//! [`bytecode::Compiler`] and finally the stack-based [`bytecode::Vm`].
//! The helpers below run the whole pipeline in one call.

#![allow(clippy::module_inception)]
#![allow(clippy::result_large_err)]
#![allow(clippy::new_without_default)]

pub mod ast;
pub mod bytecode;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod span;
pub mod value;

use ast::Program;
use bytecode::{Chunk, Compiler, Vm};
use config::VmConfig;
use error::{ParseErrors, SimianError};
use value::Value;

/// Parse source into a program, failing if any diagnostic was recorded.
pub fn parse(source: &str) -> Result<Program, ParseErrors> {
    let mut parser = parser::Parser::from_source(source);
    let program = parser.parse_program();
    let errors = parser.into_errors();

    if errors.is_empty() {
        Ok(program)
    } else {
        Err(errors)
    }
}

/// Parse and compile source into bytecode.
pub fn compile(source: &str) -> Result<Chunk, SimianError> {
    let program = parse(source)?;
    let mut compiler = Compiler::new();
    compiler.compile(&program)?;
    Ok(compiler.bytecode())
}

/// Run a program with the default limits and return its last popped value.
pub fn run(source: &str) -> Result<Value, SimianError> {
    run_with_config(source, &VmConfig::default())
}

/// Run a program with custom VM limits.
pub fn run_with_config(source: &str, config: &VmConfig) -> Result<Value, SimianError> {
    config.validate()?;
    let chunk = compile(source)?;

    let mut vm = Vm::with_config(chunk, config);
    vm.run()?;
    Ok(vm.last_popped_stack_elem())
}

/// Compile source and render the full disassembly listing.
pub fn disassemble(source: &str) -> Result<String, SimianError> {
    let chunk = compile(source)?;
    Ok(bytecode::disassemble_program(&chunk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_run_returns_last_popped_value() {
        assert_eq!(run("1 + 2 * 3").unwrap(), Value::Integer(7));
        // `OpSetGlobal` pops the bound value, so a trailing `let` echoes it
        assert_eq!(run("let x = 5;").unwrap(), Value::Integer(5));
        assert_eq!(run("").unwrap(), Value::Null);
    }

    #[test]
    fn test_full_programs() {
        let source = r#"
            let map = fn(arr, f) {
                let iter = fn(arr, acc, i) {
                    if (i > 2) { return acc; }
                    iter(arr, acc + [f(arr[i])], i + 1)
                };
                iter(arr, [], 0)
            };
            map([1, 2, 3], fn(x) { x * 2 })
        "#;
        // `iter` cannot see the locals of `map`, itself included
        assert!(matches!(run(source), Err(SimianError::Compile(_))));

        let source = r#"
            let people = [{"name": "Ada", "age": 36}, {"name": "Alan", "age": 41}];
            let older = fn(p) { p["age"] > 40 };
            if (older(people[1])) { people[1]["name"] } else { "nobody" }
        "#;
        assert_eq!(run(source).unwrap(), Value::string("Alan"));
    }

    #[test]
    fn test_parse_errors_surface_as_list() {
        let err = run("let x 5; let = 10;").unwrap_err();
        match err {
            SimianError::Parse(errors) => {
                assert_eq!(
                    errors.messages()[0],
                    "expected next token to be =, got INT instead"
                );
                assert!(errors.len() >= 2);
            }
            other => panic!("expected parse errors, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_and_runtime_errors() {
        assert_eq!(
            run("foo").unwrap_err().to_string(),
            "compile error: undefined variable foo"
        );
        assert!(matches!(
            run("5 / (2 - 2)"),
            Err(SimianError::Runtime(ref e)) if e.kind == RuntimeErrorKind::DivisionByZero
        ));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = VmConfig::default().with_max_frames(0);
        assert!(matches!(
            run_with_config("1", &config),
            Err(SimianError::Config(_))
        ));
    }

    #[test]
    fn test_disassemble_listing() {
        let listing = disassemble("let add = fn(a, b) { a + b }; add(1, 2)").unwrap();
        assert_eq!(
            listing,
            "== main ==\n\
             0000 OpConstant 0\n\
             0003 OpSetGlobal 0\n\
             0006 OpGetGlobal 0\n\
             0009 OpConstant 1\n\
             0012 OpConstant 2\n\
             0015 OpCall 2\n\
             0017 OpPop\n\
             \n== constants ==\n\
             0000 FUNCTION <fn/2>\n\
             0001 INTEGER 1\n\
             0002 INTEGER 2\n\
             \n== constant 0 add (params: 2, locals: 2) ==\n\
             0000 OpGetLocal 0\n\
             0002 OpGetLocal 1\n\
             0004 OpAdd\n\
             0005 OpReturnValue\n"
        );
    }
}
