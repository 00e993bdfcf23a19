//! Interactive read-eval-print loop.
//!
//! Each line is compiled and run on a fresh VM, but the symbol table,
//! constant pool and globals carry over so later lines see earlier bindings.

use std::io::{self, Write};
use std::path::PathBuf;

use colored::Colorize;

use crate::bytecode::{Compiler, SymbolTable, Vm};
use crate::config::VmConfig;
use crate::error::SimianError;
use crate::value::Value;

const HISTORY_FILE: &str = ".simian_history";
const PROMPT: &str = ">> ";

/// Compiler and VM state shared by successive inputs.
pub struct Session {
    symbol_table: SymbolTable,
    constants: Vec<Value>,
    globals: Vec<Option<Value>>,
    config: VmConfig,
}

impl Session {
    pub fn new(config: VmConfig) -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            constants: Vec::new(),
            globals: Vec::new(),
            config,
        }
    }

    /// Run one input and return its last popped value.
    ///
    /// A parse or compile failure leaves the session untouched. A runtime
    /// failure keeps whatever globals were assigned before it.
    pub fn eval(&mut self, source: &str) -> Result<Value, SimianError> {
        let program = crate::parse(source)?;

        let mut compiler = Compiler::with_state(self.symbol_table.clone(), self.constants.clone());
        compiler.compile(&program)?;
        let chunk = compiler.bytecode();
        let (symbol_table, constants) = compiler.into_state();
        self.symbol_table = symbol_table;
        self.constants = constants;

        let globals = std::mem::take(&mut self.globals);
        let mut vm = Vm::with_globals(chunk, globals, &self.config);
        let outcome = vm.run();
        let value = vm.last_popped_stack_elem();
        self.globals = vm.into_globals();

        outcome?;
        Ok(value)
    }

    /// Forget every binding.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

pub struct Repl {
    session: Session,
    history: Vec<String>,
    history_file: PathBuf,
    multiline_buffer: String,
    is_multiline: bool,
    brace_balance: i32,
}

impl Repl {
    pub fn new(config: VmConfig) -> Self {
        let mut repl = Self {
            session: Session::new(config),
            history: Vec::new(),
            history_file: Self::get_history_path(),
            multiline_buffer: String::new(),
            is_multiline: false,
            brace_balance: 0,
        };
        repl.load_history();
        repl
    }

    fn get_history_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(HISTORY_FILE),
            None => PathBuf::from(HISTORY_FILE),
        }
    }

    fn load_history(&mut self) {
        if let Ok(content) = std::fs::read_to_string(&self.history_file) {
            self.history.extend(
                content
                    .lines()
                    .filter(|line| !line.trim().is_empty())
                    .map(str::to_string),
            );
        }
    }

    fn save_history(&self) {
        if let Err(err) = std::fs::write(&self.history_file, self.history.join("\n")) {
            tracing::warn!(path = %self.history_file.display(), %err, "could not save history");
        }
    }

    pub fn run(&mut self) {
        println!("Simian {} - Monkey REPL", env!("CARGO_PKG_VERSION"));
        println!("Type .help for available commands.\n");

        let stdin = io::stdin();

        loop {
            print!("{}", self.get_prompt());
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => {
                    self.save_history();
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {
                    let line = line.trim_end();
                    if line.is_empty() && !self.is_multiline {
                        continue;
                    }

                    if matches!(line, "exit" | ".exit" | "quit" | ".quit") {
                        self.save_history();
                        println!("Goodbye!");
                        break;
                    }

                    if self.is_multiline {
                        self.handle_multiline_input(line);
                        continue;
                    }

                    self.history.push(line.to_string());

                    if line.starts_with('.') {
                        self.handle_command(line);
                    } else if count_braces(line) > 0 {
                        self.enter_multiline(line);
                    } else {
                        self.execute(line);
                    }
                }
            }
        }
    }

    fn get_prompt(&self) -> &'static str {
        if self.is_multiline {
            "... "
        } else {
            PROMPT
        }
    }

    fn enter_multiline(&mut self, line: &str) {
        self.is_multiline = true;
        self.multiline_buffer = line.to_string();
        self.brace_balance = count_braces(line);
    }

    fn handle_multiline_input(&mut self, line: &str) {
        if line == ".break" {
            self.is_multiline = false;
            self.multiline_buffer.clear();
            self.brace_balance = 0;
            println!("(cancelled)");
            return;
        }

        self.multiline_buffer.push('\n');
        self.multiline_buffer.push_str(line);
        self.brace_balance += count_braces(line);

        if self.brace_balance <= 0 {
            self.is_multiline = false;
            let code = std::mem::take(&mut self.multiline_buffer);
            self.history.push(code.replace('\n', " "));
            self.execute(&code);
        }
    }

    fn handle_command(&mut self, line: &str) {
        match line {
            ".help" => self.cmd_help(),
            ".history" => {
                for (i, entry) in self.history.iter().enumerate() {
                    println!("{:4}  {}", i + 1, entry);
                }
            }
            ".clear" => {
                self.session.reset();
                println!("Environment reset.");
            }
            _ if line.starts_with(".load ") => {
                let path = line[".load ".len()..].trim();
                match std::fs::read_to_string(path) {
                    Ok(source) => self.execute(&source),
                    Err(err) => print_error(&SimianError::Io(err)),
                }
            }
            _ => println!(
                "Unknown command: {}. Type .help for available commands.",
                line
            ),
        }
    }

    fn cmd_help(&self) {
        println!();
        println!("Simian REPL Commands");
        println!();
        println!(".help          - Show this help message");
        println!(".history       - Show command history");
        println!(".clear         - Forget all bindings");
        println!(".load <file>   - Load and execute a file");
        println!(".break         - Cancel multi-line input");
        println!("exit / Ctrl+D  - Exit the REPL");
        println!();
    }

    fn execute(&mut self, source: &str) {
        match self.session.eval(source) {
            Ok(value) if value.is_null() => {}
            Ok(value) => println!("{}", format_value(&value)),
            Err(err) => print_error(&err),
        }
    }
}

/// Colorize a result by type.
fn format_value(value: &Value) -> String {
    let text = value.to_string();
    match value {
        Value::Integer(_) => text.cyan().to_string(),
        Value::Boolean(_) => text.yellow().to_string(),
        Value::String(_) => text.green().to_string(),
        Value::Function(_) => text.magenta().to_string(),
        _ => text,
    }
}

/// Parse diagnostics print as an indented list; other errors on one line.
pub fn print_error(err: &SimianError) {
    match err {
        SimianError::Parse(errors) => {
            eprintln!("{}", "parser errors:".red().bold());
            for error in &errors.0 {
                eprintln!("\t{}", error.to_string().red());
            }
        }
        other => eprintln!("{}", other.to_string().red()),
    }
}

/// Net count of `{` over `}`, ignoring braces inside string literals.
fn count_braces(s: &str) -> i32 {
    let mut balance = 0;
    let mut in_string = false;

    for c in s.chars() {
        match c {
            '"' => in_string = !in_string,
            '{' if !in_string => balance += 1,
            '}' if !in_string => balance -= 1,
            _ => {}
        }
    }
    balance
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_keeps_bindings() {
        let mut session = Session::default();
        assert_eq!(session.eval("let a = 5;").unwrap(), Value::Integer(5));
        assert!(matches!(
            session.eval("let double = fn(x) { x * 2 };").unwrap(),
            Value::Function(_)
        ));
        assert_eq!(session.eval("double(a)").unwrap(), Value::Integer(10));
        assert_eq!(session.eval(r#""x" + "y""#).unwrap(), Value::string("xy"));
    }

    #[test]
    fn test_session_survives_errors() {
        let mut session = Session::default();
        session.eval("let a = 1;").unwrap();

        assert!(matches!(session.eval("let b 2;"), Err(SimianError::Parse(_))));
        assert!(matches!(session.eval("a + missing"), Err(SimianError::Compile(_))));
        assert!(matches!(session.eval("a + true"), Err(SimianError::Runtime(_))));

        assert_eq!(session.eval("let b = a + 1; b").unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_session_reset() {
        let mut session = Session::default();
        session.eval("let a = 1;").unwrap();
        session.reset();
        assert!(matches!(session.eval("a"), Err(SimianError::Compile(_))));
    }

    #[test]
    fn test_count_braces() {
        assert_eq!(count_braces("let f = fn() {"), 1);
        assert_eq!(count_braces("if (x) { 1 } else { 2 }"), 0);
        assert_eq!(count_braces(r#"let s = "{{";"#), 0);
        assert_eq!(count_braces("}"), -1);
    }
}
