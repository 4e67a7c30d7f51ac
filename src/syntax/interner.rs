//! Global symbol interning.
//!
//! Two symbols with identical text are the same `Symbol`, so comparison and
//! hashing are integer operations.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

static INTERNER: Lazy<RwLock<StringInterner<DefaultBackend>>> =
    Lazy::new(|| RwLock::new(StringInterner::default()));

/// A symbol that has been interned in the global string interner
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    /// Intern a string and return its symbol
    pub fn new(s: &str) -> Self {
        {
            let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(sym) = interner.get(s) {
                return Symbol(sym);
            }
        }
        let mut interner = INTERNER.write().unwrap_or_else(PoisonError::into_inner);
        Symbol(interner.get_or_intern(s))
    }

    /// Resolve the symbol and run a function with the string slice
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let interner = INTERNER.read().unwrap_or_else(PoisonError::into_inner);
        f(interner.resolve(self.0).unwrap_or_default())
    }

    /// Resolve the interned symbol back to an owned string
    pub fn as_string(&self) -> String {
        self.with_str(str::to_string)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| write!(f, "Symbol({s})"))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

// ============================================================================
// KEYWORDS - symbols the reader, expander and evaluator dispatch on
// ============================================================================

pub struct Keywords {
    pub quote: Symbol,
    pub quasiquote: Symbol,
    pub unquote: Symbol,
    pub unquote_splicing: Symbol,
    pub dot: Symbol,
    pub varg: Symbol,
    pub if_: Symbol,
    pub begin: Symbol,
    pub let_: Symbol,
    pub let_mut: Symbol,
    pub set: Symbol,
    pub lambda: Symbol,
    pub macro_: Symbol,
    pub match_: Symbol,
    pub type_: Symbol,
    pub module: Symbol,
    pub use_: Symbol,
    pub apply: Symbol,
    pub t: Symbol,
    pub wildcard: Symbol,
    pub head: Symbol,
    pub tail: Symbol,
}

static KEYWORDS: Lazy<Keywords> = Lazy::new(|| Keywords {
    quote: Symbol::new("quote"),
    quasiquote: Symbol::new("quasiquote"),
    unquote: Symbol::new("unquote"),
    unquote_splicing: Symbol::new("unquote-splicing"),
    dot: Symbol::new("."),
    varg: Symbol::new("varg"),
    if_: Symbol::new("if"),
    begin: Symbol::new("begin"),
    let_: Symbol::new("let"),
    let_mut: Symbol::new("let!"),
    set: Symbol::new("set!"),
    lambda: Symbol::new("lambda"),
    macro_: Symbol::new("macro"),
    match_: Symbol::new("match"),
    type_: Symbol::new("type"),
    module: Symbol::new("module"),
    use_: Symbol::new("use"),
    apply: Symbol::new("apply"),
    t: Symbol::new("t"),
    wildcard: Symbol::new("_"),
    head: Symbol::new("head"),
    tail: Symbol::new("tail"),
});

pub fn keywords() -> &'static Keywords {
    &KEYWORDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_yields_same_symbol() {
        assert_eq!(Symbol::new("foo"), Symbol::new("foo"));
        assert_ne!(Symbol::new("foo"), Symbol::new("bar"));
    }

    #[test]
    fn symbols_resolve_to_their_text() {
        let sym = Symbol::new("unquote-splicing");
        assert_eq!(sym.as_string(), "unquote-splicing");
        assert_eq!(format!("{sym}"), "unquote-splicing");
        assert_eq!(keywords().unquote_splicing, sym);
    }
}
