//! Lexical environments.
//!
//! An `Env` is a chain of frames. Each frame maps symbols to shared
//! `Binding` slots tagged mutable or immutable; `use` aliases a slot into
//! another frame rather than copying its value, so `set!` through either
//! name is visible through both.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::errors::{ErrorKind, LustError};
use crate::runtime::value::Value;
use crate::syntax::Symbol;

pub struct Binding {
    value: RefCell<Value>,
    mutable: bool,
}

impl Binding {
    pub fn new(value: Value, mutable: bool) -> Rc<Binding> {
        Rc::new(Binding {
            value: RefCell::new(value),
            mutable,
        })
    }

    pub fn get(&self) -> Value {
        self.value.borrow().clone()
    }

    /// Fill the slot unconditionally; assignment checks happen in `Env::assign`.
    pub fn set(&self, value: Value) {
        *self.value.borrow_mut() = value;
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }
}

struct Frame {
    bindings: RefCell<HashMap<Symbol, Rc<Binding>>>,
    parent: Option<Env>,
}

#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    /// A root frame with no parent.
    pub fn new() -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A fresh frame whose lookups fall back to `self`.
    pub fn child(&self) -> Self {
        Env(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    /// Bind `name` in this frame, replacing any binding it already had here.
    pub fn define(&self, name: Symbol, value: Value, mutable: bool) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name, Binding::new(value, mutable));
    }

    /// Allocate a slot now and fill it later; lets a value capture an
    /// environment that already contains its own name.
    pub fn reserve(&self, name: Symbol, mutable: bool) -> Rc<Binding> {
        let slot = Binding::new(Value::Nil, mutable);
        self.0.bindings.borrow_mut().insert(name, slot.clone());
        slot
    }

    /// Make `binding` visible under `name` in this frame.
    pub fn alias(&self, name: Symbol, binding: Rc<Binding>) {
        self.0.bindings.borrow_mut().insert(name, binding);
    }

    pub fn binding(&self, name: Symbol) -> Option<Rc<Binding>> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(slot) = current.0.bindings.borrow().get(&name) {
                return Some(slot.clone());
            }
            env = current.0.parent.as_ref();
        }
        None
    }

    pub fn lookup(&self, name: Symbol) -> Option<Value> {
        self.binding(name).map(|slot| slot.get())
    }

    /// Lookup restricted to this frame.
    pub fn lookup_local(&self, name: Symbol) -> Option<Value> {
        self.0.bindings.borrow().get(&name).map(|slot| slot.get())
    }

    pub fn is_bound(&self, name: Symbol) -> bool {
        self.binding(name).is_some()
    }

    /// Rebind the value slot of an existing mutable binding.
    pub fn assign(&self, name: Symbol, value: Value) -> Result<(), LustError> {
        let slot = self.binding(name).ok_or_else(|| {
            LustError::new(ErrorKind::UnboundVariable {
                symbol: name.as_string(),
            })
        })?;
        if !slot.is_mutable() {
            return Err(LustError::new(ErrorKind::ImmutableBindingAssignment {
                symbol: name.as_string(),
            }));
        }
        slot.set(value);
        Ok(())
    }

    /// The bindings of this frame only, sorted by name.
    pub fn local_bindings(&self) -> Vec<(Symbol, Rc<Binding>)> {
        let mut bindings: Vec<_> = self
            .0
            .bindings
            .borrow()
            .iter()
            .map(|(name, slot)| (*name, slot.clone()))
            .collect();
        bindings.sort_by_key(|(name, _)| name.as_string());
        bindings
    }

    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("bindings", &self.0.bindings.borrow().len())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str) -> Symbol {
        Symbol::new(name)
    }

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let global = Env::new();
        global.define(sym("x"), Value::Int(1), false);
        let inner = global.child();
        inner.define(sym("x"), Value::Int(2), false);
        assert_eq!(inner.lookup(sym("x")), Some(Value::Int(2)));
        assert_eq!(global.lookup(sym("x")), Some(Value::Int(1)));
        assert_eq!(inner.lookup(sym("missing")), None);
    }

    #[test]
    fn assignment_respects_mutability() {
        let env = Env::new();
        env.define(sym("a"), Value::Int(1), false);
        env.define(sym("b"), Value::Int(1), true);

        let err = env.assign(sym("a"), Value::Int(2)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ImmutableBindingAssignment { .. }));
        assert_eq!(env.lookup(sym("a")), Some(Value::Int(1)));

        env.child().assign(sym("b"), Value::Int(2)).unwrap();
        assert_eq!(env.lookup(sym("b")), Some(Value::Int(2)));

        let err = env.assign(sym("c"), Value::Int(2)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnboundVariable { .. }));
    }

    #[test]
    fn aliases_share_the_slot() {
        let module = Env::new();
        module.define(sym("counter"), Value::Int(0), true);
        let user = Env::new();
        for (name, slot) in module.local_bindings() {
            user.alias(name, slot);
        }
        user.assign(sym("counter"), Value::Int(5)).unwrap();
        assert_eq!(module.lookup(sym("counter")), Some(Value::Int(5)));
    }

    #[test]
    fn reserved_slots_are_visible_before_they_are_filled() {
        let env = Env::new();
        let slot = env.reserve(sym("f"), false);
        assert_eq!(env.lookup(sym("f")), Some(Value::Nil));
        slot.set(Value::Int(7));
        assert_eq!(env.lookup(sym("f")), Some(Value::Int(7)));
    }
}
