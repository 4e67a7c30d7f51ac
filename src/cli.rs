//! The Lust command-line interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions. All evaluation happens on a dedicated thread
//! sized by `InterpreterConfig::stack_size`.

use std::process;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::{
    config::InterpreterConfig,
    engine::{run_with_stack, ExecutionPipeline},
    errors::{print_error, LustError},
    runtime::value::Value,
};

pub mod args;

pub use args::{Command, LustArgs};

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = LustArgs::parse();
    init_tracing(args.verbose);

    let config = load_config(&args).unwrap_or_else(|error| {
        print_error(error);
        process::exit(1);
    });

    let stack_size = config.stack_size;
    let command = args.command;
    if let Err(error) = run_with_stack(stack_size, move || execute(command, config)) {
        print_error(error);
        process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` refines the level chosen by `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Defaults, then the config file, then individual flags.
fn load_config(args: &LustArgs) -> Result<InterpreterConfig, LustError> {
    let mut config = match &args.config {
        Some(path) => InterpreterConfig::from_yaml_file(path)?,
        None => InterpreterConfig::default(),
    };
    if let Some(max_depth) = args.max_depth {
        config.max_depth = max_depth;
    }
    if let Some(mib) = args.stack_size_mb {
        config.stack_size = mib.saturating_mul(1024 * 1024);
    }
    Ok(config)
}

// ============================================================================
// COMMAND DISPATCH
// ============================================================================

fn execute(command: Command, config: InterpreterConfig) -> Result<(), LustError> {
    match command {
        Command::Run { file } => {
            let mut pipeline = ExecutionPipeline::with_config(config);
            let value = pipeline.execute_file(&file)?;
            if !matches!(value, Value::Nil) {
                println!("{value}");
            }
        }

        Command::Expand { file } => {
            let source = ExecutionPipeline::read_file(&file)?;
            let mut pipeline = ExecutionPipeline::with_config(config);
            for form in pipeline.expand_source(&file.display().to_string(), &source)? {
                println!("{form}");
            }
        }

        Command::Read { file } => {
            let source = ExecutionPipeline::read_file(&file)?;
            for form in ExecutionPipeline::read_source(&file.display().to_string(), &source)? {
                println!("{form}");
            }
        }

        Command::ListAtoms => {
            let pipeline = ExecutionPipeline::with_config(config);
            for name in pipeline.list_atoms() {
                println!("{name}");
            }
        }
    }
    Ok(())
}
