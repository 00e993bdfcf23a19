//! Simian CLI: run Monkey files, evaluate snippets or start the REPL.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use simian::config::{VmConfig, DEFAULT_GLOBALS_SIZE, DEFAULT_MAX_FRAMES, DEFAULT_STACK_SIZE};
use simian::error::SimianError;
use simian::repl::{print_error, Repl};

#[derive(Parser)]
#[command(
    name = "simian",
    about = "Bytecode compiler and virtual machine for the Monkey language",
    version
)]
struct Cli {
    /// Monkey source file to execute
    file: Option<PathBuf>,

    /// Evaluate code from the command line
    #[arg(short = 'e', long = "eval", conflicts_with = "file")]
    eval: Option<String>,

    /// Print the compiled bytecode instead of running it
    #[arg(short = 'd', long)]
    disassemble: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Operand stack slots
    #[arg(long, env = "SIMIAN_STACK_SIZE", default_value_t = DEFAULT_STACK_SIZE)]
    stack_size: usize,

    /// Global variable slots
    #[arg(long, env = "SIMIAN_GLOBALS_SIZE", default_value_t = DEFAULT_GLOBALS_SIZE)]
    globals_size: usize,

    /// Maximum call depth
    #[arg(long, env = "SIMIAN_MAX_FRAMES", default_value_t = DEFAULT_MAX_FRAMES)]
    max_frames: usize,
}

impl Cli {
    fn config(&self) -> VmConfig {
        VmConfig::default()
            .with_stack_size(self.stack_size)
            .with_globals_size(self.globals_size)
            .with_max_frames(self.max_frames)
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config();
    if let Err(err) = config.validate() {
        print_error(&SimianError::Config(err));
        process::exit(1);
    }

    let source = match (&cli.eval, &cli.file) {
        (Some(code), _) => code.clone(),
        (None, Some(path)) => match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                eprintln!("{}", format!("could not read {}: {}", path.display(), err).red());
                process::exit(1);
            }
        },
        (None, None) => {
            Repl::new(config).run();
            return;
        }
    };

    if let Err(err) = execute(&source, &cli, &config) {
        print_error(&err);
        process::exit(1);
    }
}

fn execute(source: &str, cli: &Cli, config: &VmConfig) -> Result<(), SimianError> {
    if cli.disassemble {
        print!("{}", simian::disassemble(source)?);
        return Ok(());
    }

    let value = simian::run_with_config(source, config)?;
    if !value.is_null() {
        println!("{}", value);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("simian=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("simian=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
