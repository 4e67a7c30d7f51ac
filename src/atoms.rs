// # Lust Atom System
//
// Atoms are the native primitives every program starts with: arithmetic,
// comparison, list and collection operations, strings and output.
//
// ## Module Structure
//
// - **`helpers`**: Shared infrastructure for all atoms
// - **`math`**: Arithmetic (`+`, `-`, `*`, `/`, `mod`)
// - **`logic`**: Comparison and predicates (`=`, `<`, `not`, `eq?`, ...)
// - **`collections`**: Lists, vectors, sets and maps
// - **`string`**: Strings and symbols (`str`, `symbol`, `gensym`)
// - **`external`**: Output (`println`, `display`)
//
// ## Calling Conventions
//
// Arguments are always evaluated before an atom is called. Forms that need
// their arguments unevaluated are special forms in `runtime::special_forms`,
// never atoms.
//
// 1.  **`Pure`**: receives only the argument values.
// 2.  **`Stateful`**: also receives the `EvaluationContext`, for output and
//     the gensym counter.

use std::{cell::RefCell, rc::Rc};

use im::HashMap;

use crate::{
    engine::EvaluationContext,
    errors::LustError,
    runtime::{
        env::Env,
        value::{NativeFn, Value},
    },
    syntax::Symbol,
};

// ============================================================================
// ATOM TYPES
// ============================================================================

/// Pure atoms: operate only on values, no state access
pub type PureAtomFn = fn(args: &[Value]) -> Result<Value, LustError>;

/// Stateful atoms: need the evaluation context (output, gensym counter)
pub type StatefulAtomFn =
    fn(args: &[Value], context: &mut EvaluationContext) -> Result<Value, LustError>;

/// A native primitive and its calling convention
#[derive(Clone, Copy)]
pub enum Atom {
    Pure(PureAtomFn),
    Stateful(StatefulAtomFn),
}

// ============================================================================
// OUTPUT
// ============================================================================

// Output sink for `println`, etc., to make I/O testable and injectable.
pub trait OutputSink {
    fn emit(&mut self, text: &str);
}

// A null output sink for testing or running without output.
pub struct NullSink;
impl OutputSink for NullSink {
    fn emit(&mut self, _text: &str) {}
}

/// Ergonomic, extensible wrapper for shared, mutable output sinks.
#[derive(Clone)]
pub struct SharedOutput(pub Rc<RefCell<dyn OutputSink>>);

impl SharedOutput {
    /// Create a new SharedOutput from any OutputSink.
    pub fn new<T: OutputSink + 'static>(sink: T) -> Self {
        SharedOutput(Rc::new(RefCell::new(sink)))
    }

    /// Emit output via the sink.
    pub fn emit(&self, text: &str) {
        self.0.borrow_mut().emit(text);
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

// Registry for all atoms, inspectable at runtime.
#[derive(Default, Clone)]
pub struct AtomRegistry {
    pub atoms: HashMap<String, Atom>,
}

impl AtomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Atom> {
        self.atoms.get(name)
    }

    /// Atom names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.atoms.keys().cloned().collect();
        names.sort();
        names
    }

    fn register(&mut self, name: &str, func: Atom) {
        self.atoms.insert(name.to_string(), func);
    }

    /// Register a pure atom that operates only on values with no state access.
    pub fn register_pure(&mut self, name: &str, func: PureAtomFn) {
        self.register(name, Atom::Pure(func));
    }

    /// Register a stateful atom that needs the evaluation context.
    pub fn register_stateful(&mut self, name: &str, func: StatefulAtomFn) {
        self.register(name, Atom::Stateful(func));
    }

    pub fn has(&self, name: &str) -> bool {
        self.atoms.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Bind every atom immutably in `env`.
    pub fn install(&self, env: &Env) {
        for (name, atom) in self.atoms.iter() {
            env.define(
                Symbol::new(name),
                Value::Native(NativeFn {
                    name: Rc::from(name.as_str()),
                    atom: *atom,
                }),
                false,
            );
        }
    }
}

// ============================================================================
// MODULAR ATOM IMPLEMENTATIONS
// ============================================================================

// Core infrastructure shared by all atoms
pub mod helpers;

// Domain-specific atom modules
pub mod collections;
pub mod external;
pub mod logic;
pub mod math;
pub mod string;

// ============================================================================
// UNIFIED REGISTRATION FUNCTION
// ============================================================================

/// Registers all standard atoms from all modules with the given registry.
pub fn register_all_atoms(registry: &mut AtomRegistry) {
    math::register_math_atoms(registry);
    logic::register_logic_atoms(registry);
    collections::register_collection_atoms(registry);
    string::register_string_atoms(registry);
    external::register_external_atoms(registry);
}

/// A registry holding every standard atom.
pub fn build_std_registry() -> AtomRegistry {
    let mut registry = AtomRegistry::new();
    register_all_atoms(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_registry_has_every_primitive_family() {
        let registry = build_std_registry();
        for name in ["+", "mod", "<=", "eq?", "nth", "dissoc", "gensym", "println"] {
            assert!(registry.has(name), "missing atom {name}");
        }
        let names = registry.list();
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn install_binds_natives_immutably() {
        let env = Env::new();
        build_std_registry().install(&env);
        let plus = Symbol::new("+");
        assert!(matches!(env.lookup(plus), Some(Value::Native(_))));
        assert!(env.assign(plus, Value::Nil).is_err());
    }
}
