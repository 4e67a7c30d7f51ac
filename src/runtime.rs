//! Runtime module for the Lust language
//!
//! The value model, lexical environments, and the evaluator. Code and data
//! share one representation: the reader produces `Value` trees, macros
//! rewrite them, and the evaluator reduces them.

pub mod env;
pub mod eval;
pub mod modules;
pub mod numeric;
pub mod pattern;
pub mod quasiquote;
pub mod special_forms;
pub mod value;

pub use env::{Binding, Env};
pub use eval::{apply, eval, Trampoline};
pub use modules::ModuleTable;
pub use numeric::Number;
pub use value::{Lambda, MapValue, Module, NativeFn, ParamList, Record, RecordVariant, Value};
