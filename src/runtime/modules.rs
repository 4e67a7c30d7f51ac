//! The module system.
//!
//! `(module Name decl...)` evaluates its declarations in a fresh frame
//! under the global environment and registers the frame by name.
//! `Name.member` reads from that frame; `(use Name)` aliases every member
//! into the current frame.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::engine::EvaluationContext;
use crate::errors::{ErrorKind, ErrorReporting, LustError};
use crate::macros;
use crate::runtime::env::Env;
use crate::runtime::eval::eval;
use crate::runtime::value::{Module, Value};
use crate::syntax::Symbol;

/// Named modules of one interpreter session.
#[derive(Default)]
pub struct ModuleTable {
    modules: HashMap<Symbol, Rc<Module>>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: Symbol) -> Option<Rc<Module>> {
        self.modules.get(&name).cloned()
    }

    pub fn contains(&self, name: Symbol) -> bool {
        self.modules.contains_key(&name)
    }

    pub fn register(&mut self, module: Rc<Module>) -> Result<(), LustError> {
        if self.contains(module.name) {
            return Err(duplicate(module.name));
        }
        self.modules.insert(module.name, module);
        Ok(())
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().map(Symbol::as_string).collect();
        names.sort();
        names
    }
}

fn duplicate(name: Symbol) -> LustError {
    LustError::new(ErrorKind::DuplicateModuleDefinition {
        module: name.as_string(),
    })
}

/// Evaluate `declarations` into a new module frame and register it.
pub fn define_module(
    name: Symbol,
    declarations: &[Value],
    ctx: &mut EvaluationContext,
) -> Result<(), LustError> {
    if ctx.modules.contains(name) {
        return Err(duplicate(name));
    }

    let frame = ctx.global.child();
    for declaration in declarations {
        let expanded = macros::expand(declaration, &frame, ctx)?;
        eval(&expanded, &frame, ctx)?;
    }

    let members = frame.local_bindings().len();
    ctx.modules.register(Rc::new(Module { name, env: frame }))?;
    debug!(module = %name, members, "registered module");
    Ok(())
}

/// Alias every member of module `name` into `env`'s own frame.
pub fn use_module(name: Symbol, env: &Env, ctx: &EvaluationContext) -> Result<(), LustError> {
    let module = ctx
        .modules
        .get(name)
        .ok_or_else(|| ctx.module_not_found(&name.as_string()))?;
    let members = module.env.local_bindings();
    debug!(module = %name, members = members.len(), "using module");
    for (member, slot) in members {
        env.alias(member, slot);
    }
    Ok(())
}

/// Resolve the left side of `Name.member`: a variable if one is bound,
/// otherwise a registered module.
pub fn resolve_qualifier(
    name: Symbol,
    env: &Env,
    ctx: &EvaluationContext,
) -> Result<Value, LustError> {
    if let Some(value) = env.lookup(name) {
        return Ok(value);
    }
    ctx.modules
        .get(name)
        .map(Value::Module)
        .ok_or_else(|| ctx.module_not_found(&name.as_string()))
}
