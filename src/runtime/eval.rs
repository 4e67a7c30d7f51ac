//! Lust Evaluator
//!
//! A tree-walking evaluator over expanded `Value` forms. Every form that
//! sits in tail position (the last body expression, an `if` branch, a
//! `match` arm, a macro expansion) is returned to the driver loop as a
//! `Trampoline::Eval` instead of being evaluated recursively, so
//! self-recursive loops run in constant native stack. Non-tail evaluation
//! goes through `eval`, which counts nesting against the configured limit
//! and grows the native stack when it runs low.

use std::rc::Rc;

use im::{HashSet as ImHashSet, Vector as ImVector};

use crate::atoms::Atom;
use crate::engine::EvaluationContext;
use crate::errors::{ErrorReporting, LustError};
use crate::macros;
use crate::runtime::env::Env;
use crate::runtime::special_forms;
use crate::runtime::value::{Lambda, MapValue, Record, Value};
use crate::syntax::Symbol;

/// Result of one evaluation step.
pub enum Trampoline {
    /// Evaluation finished with this value.
    Value(Value),
    /// Continue by evaluating this form in this environment.
    Eval(Value, Env),
}

// ============================================================================
// DRIVER
// ============================================================================

/// Headroom left on the native stack before `eval` moves to a new segment.
pub const STACK_RED_ZONE: usize = 256 * 1024;

/// Size of each native stack segment allocated for deep recursion.
pub const STACK_SEGMENT_SIZE: usize = 8 * 1024 * 1024;

/// Evaluate `expr` in `env` to a value.
///
/// Nested evaluation grows the native stack on demand, so the depth limit
/// holds on whatever thread the caller runs on.
pub fn eval(expr: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Value, LustError> {
    ctx.enter()?;
    let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || {
        run(expr.clone(), env.clone(), ctx)
    });
    ctx.leave();
    result
}

fn run(mut expr: Value, mut env: Env, ctx: &mut EvaluationContext) -> Result<Value, LustError> {
    loop {
        match eval_step(&expr, &env, ctx)? {
            Trampoline::Value(value) => return Ok(value),
            Trampoline::Eval(next_expr, next_env) => {
                expr = next_expr;
                env = next_env;
            }
        }
    }
}

/// Finish a trampoline result.
pub fn force(step: Trampoline, ctx: &mut EvaluationContext) -> Result<Value, LustError> {
    match step {
        Trampoline::Value(value) => Ok(value),
        Trampoline::Eval(expr, env) => eval(&expr, &env, ctx),
    }
}

fn eval_step(expr: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    match expr {
        Value::Symbol(sym) => resolve_symbol(*sym, env, ctx).map(Trampoline::Value),

        Value::Pair(pair) => eval_call(&pair.head, &pair.tail, env, ctx),

        Value::Vector(items) => {
            let evaluated = items
                .iter()
                .map(|item| eval(item, env, ctx))
                .collect::<Result<ImVector<_>, _>>()?;
            Ok(Trampoline::Value(Value::Vector(evaluated)))
        }

        // Sets and maps spliced into code by a macro evaluate their elements.
        Value::Set(items) => {
            let evaluated = items
                .iter()
                .map(|item| eval(item, env, ctx))
                .collect::<Result<ImHashSet<_>, _>>()?;
            Ok(Trampoline::Value(Value::Set(evaluated)))
        }

        Value::Map(map) => {
            let mut evaluated = MapValue::new();
            for (key, value) in map.iter() {
                let key = eval(key, env, ctx)?;
                let value = eval(value, env, ctx)?;
                evaluated = evaluated.insert(key, value);
            }
            Ok(Trampoline::Value(Value::Map(evaluated)))
        }

        Value::SetLiteral(items) => {
            let mut evaluated = ImHashSet::new();
            for item in items.iter() {
                evaluated.insert(eval(item, env, ctx)?);
            }
            Ok(Trampoline::Value(Value::Set(evaluated)))
        }

        Value::MapLiteral(entries) => {
            let mut evaluated = MapValue::new();
            for (key, value) in entries.iter() {
                let key = eval(key, env, ctx)?;
                let value = eval(value, env, ctx)?;
                evaluated = evaluated.insert(key, value);
            }
            Ok(Trampoline::Value(Value::Map(evaluated)))
        }

        _ => Ok(Trampoline::Value(expr.clone())),
    }
}

/// Variables first, then the module table, so a bare module name evaluates
/// to its module.
pub fn resolve_symbol(
    sym: Symbol,
    env: &Env,
    ctx: &EvaluationContext,
) -> Result<Value, LustError> {
    if let Some(value) = env.lookup(sym) {
        return Ok(value);
    }
    if let Some(module) = ctx.modules.get(sym) {
        return Ok(Value::Module(module));
    }
    Err(ctx.unbound_variable(&sym.as_string()))
}

// ============================================================================
// APPLICATION
// ============================================================================

fn eval_call(
    head: &Value,
    args: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Trampoline, LustError> {
    if let Value::Symbol(sym) = head {
        if let Some(special_form) = special_forms::lookup(*sym) {
            return special_form(args, env, ctx);
        }
    }

    let callee = eval(head, env, ctx)?;

    // A macro reached at run time: expand the call here, then continue with
    // the expansion in tail position.
    if let Value::Macro(mac) = &callee {
        let arg_forms = args.expect_list("macro arguments")?;
        let expansion = macros::expand_call(mac, arg_forms, ctx)?;
        let expansion = macros::expand(&expansion, env, ctx)?;
        return Ok(Trampoline::Eval(expansion, env.clone()));
    }

    let mut values = Vec::new();
    for arg in args.iter_list() {
        values.push(eval(arg, env, ctx)?);
    }
    apply(&callee, values, ctx)
}

/// Apply a callable to already evaluated arguments. Closure bodies come
/// back as a tail call.
pub fn apply(
    callee: &Value,
    args: Vec<Value>,
    ctx: &mut EvaluationContext,
) -> Result<Trampoline, LustError> {
    match callee {
        Value::Closure(lambda) => {
            let scope = bind_arguments(lambda, args, ctx)?;
            eval_body(&lambda.body, &scope, ctx)
        }

        Value::Native(native) => {
            let result = match native.atom {
                Atom::Pure(f) => f(&args),
                Atom::Stateful(f) => f(&args, ctx),
            };
            result.map(Trampoline::Value)
        }

        Value::Constructor(variant) => {
            if args.len() != variant.fields.len() {
                return Err(ctx
                    .arity_mismatch(&variant.fields.len().to_string(), args.len())
                    .with_help(format!("constructor `{}` takes one value per field", variant.tag)));
            }
            Ok(Trampoline::Value(Value::Record(Rc::new(Record {
                variant: variant.clone(),
                values: args,
            }))))
        }

        other => Err(ctx.type_mismatch("a function", &other.describe())),
    }
}

/// Apply and run to completion; the entry point for host code.
pub fn call(
    callee: &Value,
    args: Vec<Value>,
    ctx: &mut EvaluationContext,
) -> Result<Value, LustError> {
    let step = apply(callee, args, ctx)?;
    force(step, ctx)
}

/// A fresh frame under the closure's captured environment with its
/// parameters bound immutably.
pub fn bind_arguments(
    lambda: &Lambda,
    args: Vec<Value>,
    ctx: &EvaluationContext,
) -> Result<Env, LustError> {
    if !lambda.params.accepts(args.len()) {
        let err = ctx.arity_mismatch(&lambda.params.arity_string(), args.len());
        return Err(match lambda.name {
            Some(name) => err.with_help(format!("in call to `{}`", name)),
            None => err,
        });
    }
    let scope = lambda.env.child();
    for (name, value) in lambda.params.bind(args) {
        scope.define(name, value, false);
    }
    Ok(scope)
}

/// Evaluate all but the last form; the last one is returned as a tail call.
pub fn eval_body(
    body: &[Value],
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Trampoline, LustError> {
    match body.split_last() {
        None => Ok(Trampoline::Value(Value::Nil)),
        Some((last, init)) => {
            for form in init {
                eval(form, env, ctx)?;
            }
            Ok(Trampoline::Eval(last.clone(), env.clone()))
        }
    }
}
