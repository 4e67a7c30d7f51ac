//! # Lust Macro Expansion
//!
//! Macros are ordinary procedures over unevaluated forms. A call whose head
//! names a macro is rewritten by running the macro body with its parameters
//! bound to the argument *forms*; the result is expanded again until nothing
//! at the head of the node is a macro, and only then are the node's children
//! expanded.
//!
//! ## Rules
//!
//! - Expansion is unhygienic: the expansion is evaluated in the caller's
//!   environment, so a template that introduces a binding can capture a
//!   caller's variable of the same name. Use `gensym` for fresh names.
//! - Nothing inside `quote` is expanded. Inside `quasiquote` only the
//!   `unquote`/`unquote-splicing` points are ordinary code.
//! - Special forms always win over macros of the same name.
//! - Rewrites at a single node, and the nesting of expansions, are both
//!   bounded by `max_macro_expansions`; exceeding either is a
//!   `MacroExpansion` error.

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

mod expander;

pub use expander::{expand, expand_call, macro_at_head};

/// Default bound on rewrites of a single form and on expansion nesting.
pub const DEFAULT_MAX_MACRO_EXPANSIONS: usize = 1_000;
