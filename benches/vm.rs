//! Benchmarks for the compiler and the bytecode VM.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use simian::ast::Program;
use simian::bytecode::{Compiler, Vm};
use std::fs;

fn load_program(name: &str) -> String {
    let path = format!("benches/programs/{}.monkey", name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("failed to read {}", path))
}

fn parse(source: &str) -> Program {
    simian::parse(source).expect("parse error")
}

/// Compile and execute, returning the last popped value.
fn run_vm(program: &Program) -> simian::value::Value {
    let mut compiler = Compiler::new();
    compiler.compile(program).expect("compile error");
    let mut vm = Vm::new(compiler.bytecode());
    vm.run().expect("vm runtime error");
    vm.last_popped_stack_elem()
}

fn fibonacci(c: &mut Criterion) {
    let source = load_program("fib_recursive");
    let program = parse(&source);

    c.bench_function("fib_recursive", |b| b.iter(|| run_vm(black_box(&program))));
}

fn fib_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("fib_scaling");

    for n in [10, 15, 20].iter() {
        let source = format!(
            "let fib = fn(n) {{ if (n < 2) {{ return n; }} fib(n - 1) + fib(n - 2) }}; fib({});",
            n
        );
        let program = parse(&source);

        group.bench_with_input(BenchmarkId::new("vm", n), &program, |b, program| {
            b.iter(|| run_vm(black_box(program)))
        });
    }

    group.finish();
}

fn aggregates(c: &mut Criterion) {
    let source = load_program("aggregates");
    let program = parse(&source);

    c.bench_function("aggregates", |b| b.iter(|| run_vm(black_box(&program))));
}

/// Source to bytecode without execution.
fn pipeline_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_overhead");
    let source = load_program("aggregates");

    group.bench_function("parse", |b| b.iter(|| parse(black_box(&source))));

    let program = parse(&source);
    group.bench_function("compile", |b| {
        b.iter(|| {
            let mut compiler = Compiler::new();
            compiler.compile(black_box(&program)).unwrap();
            compiler.bytecode()
        })
    });

    group.finish();
}

criterion_group!(benches, fibonacci, fib_scaling, aggregates, pipeline_overhead);

criterion_main!(benches);
