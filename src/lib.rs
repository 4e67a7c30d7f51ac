//! Lust: a small Lisp with quasiquoting, unhygienic macros, pattern
//! matching and modules.
//!
//! Source text flows through the `syntax` reader into `Value` trees, through
//! the `macros` expander, and into the `runtime` evaluator. The `engine`
//! drives that pipeline one top-level form at a time.

pub mod atoms;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod macros;
pub mod runtime;
pub mod syntax;

pub use atoms::{Atom, OutputSink, SharedOutput};
pub use config::InterpreterConfig;
pub use engine::{run_with_stack, EvaluationContext, ExecutionPipeline, OutputBuffer};
pub use errors::{ErrorCategory, ErrorKind, LustError, SourceContext};
pub use runtime::{Env, Value};
pub use syntax::{read_all, Span, Spanned, Symbol};
