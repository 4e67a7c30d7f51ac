//! Defines the command-line arguments and subcommands for the Lust CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "lust",
    version,
    about = "A small Lisp with quasiquoting, macros, pattern matching and modules."
)]
pub struct LustArgs {
    #[command(subcommand)]
    pub command: Command,

    /// YAML file with interpreter limits.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum nesting of non-tail evaluation.
    #[arg(long, global = true, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Native stack of the evaluation thread, in MiB.
    #[arg(long, global = true, value_name = "MIB")]
    pub stack_size_mb: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read, expand and evaluate a script; print the last value unless nil.
    Run {
        /// The path to the Lust script file to run.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print every top-level form after macro expansion.
    Expand {
        /// The path to the Lust script file to expand.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print every top-level form as read, without expanding or evaluating.
    Read {
        /// The path to the Lust script file to read.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// List all available atoms.
    ListAtoms,
}
