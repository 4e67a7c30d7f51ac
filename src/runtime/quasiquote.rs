//! Quasiquote templates.
//!
//! A template is copied as data except at `unquote`/`unquote-splicing`
//! points at the template's own nesting level, which are evaluated. Nested
//! quasiquotes raise the level and unquotes lower it, so inner templates
//! survive untouched until they are themselves evaluated.
//!
//! Set and map forms at the outermost level become real sets and maps,
//! their elements instantiated in source order.

use crate::engine::EvaluationContext;
use crate::errors::{ErrorReporting, LustError};
use crate::runtime::env::Env;
use crate::runtime::eval::eval;
use crate::runtime::value::{MapValue, Value};
use crate::syntax::{keywords, Symbol};

/// Instantiate `template` (the argument of a `quasiquote` form).
pub fn quasiquote(
    template: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Value, LustError> {
    instantiate(template, 1, env, ctx)
}

/// The argument of a two-element `(head arg)` form.
pub fn single_argument(form: &Value, head: Symbol) -> Option<Value> {
    if !form.is_form(head) {
        return None;
    }
    match form.list_to_vec().as_deref() {
        Some([_, arg]) => Some(arg.clone()),
        _ => None,
    }
}

fn wrap(head: Symbol, value: Value) -> Value {
    Value::list(vec![Value::Symbol(head), value])
}

fn instantiate(
    form: &Value,
    depth: usize,
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Value, LustError> {
    let kw = keywords();
    match form {
        Value::Pair(_) => {
            if let Some(arg) = single_argument(form, kw.unquote) {
                return if depth == 1 {
                    eval(&arg, env, ctx)
                } else {
                    Ok(wrap(kw.unquote, instantiate(&arg, depth - 1, env, ctx)?))
                };
            }
            if let Some(arg) = single_argument(form, kw.quasiquote) {
                return Ok(wrap(kw.quasiquote, instantiate(&arg, depth + 1, env, ctx)?));
            }
            if let Some(arg) = single_argument(form, kw.unquote_splicing) {
                if depth == 1 {
                    return Err(ctx
                        .invalid_operation("unquote-splicing", "a position outside a list or vector")
                        .with_help("`,@` may only appear as an element of a list or vector"));
                }
                return Ok(wrap(
                    kw.unquote_splicing,
                    instantiate(&arg, depth - 1, env, ctx)?,
                ));
            }

            let mut iter = form.iter_list();
            let items = instantiate_items(iter.by_ref(), depth, env, ctx)?;
            let tail = match iter.remainder() {
                Value::Nil => Value::Nil,
                rest => instantiate(rest, depth, env, ctx)?,
            };
            Ok(Value::list_with_tail(items, tail))
        }

        Value::Vector(items) => Ok(Value::Vector(
            instantiate_items(items.iter(), depth, env, ctx)?
                .into_iter()
                .collect(),
        )),

        Value::Set(items) => Ok(Value::Set(
            instantiate_items(items.iter(), depth, env, ctx)?
                .into_iter()
                .collect(),
        )),

        Value::Map(map) => {
            let mut result = MapValue::new();
            for (key, value) in map.iter() {
                let key = instantiate(key, depth, env, ctx)?;
                let value = instantiate(value, depth, env, ctx)?;
                result = result.insert(key, value);
            }
            Ok(Value::Map(result))
        }

        Value::SetLiteral(items) => {
            let items = instantiate_items(items.iter(), depth, env, ctx)?;
            if depth == 1 {
                Ok(Value::Set(items.into_iter().collect()))
            } else {
                Ok(Value::SetLiteral(items.into()))
            }
        }

        Value::MapLiteral(entries) => {
            let mut instantiated = Vec::with_capacity(entries.len());
            for (key, value) in entries.iter() {
                instantiated.push((
                    instantiate(key, depth, env, ctx)?,
                    instantiate(value, depth, env, ctx)?,
                ));
            }
            if depth == 1 {
                Ok(Value::Map(instantiated.into_iter().collect()))
            } else {
                Ok(Value::MapLiteral(instantiated.into()))
            }
        }

        other => Ok(other.clone()),
    }
}

fn instantiate_items<'a>(
    items: impl Iterator<Item = &'a Value>,
    depth: usize,
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Vec<Value>, LustError> {
    let kw = keywords();
    let mut out = Vec::new();
    for item in items {
        match single_argument(item, kw.unquote_splicing) {
            Some(arg) if depth == 1 => {
                let spliced = eval(&arg, env, ctx)?;
                splice_into(&mut out, spliced, ctx)?;
            }
            _ => out.push(instantiate(item, depth, env, ctx)?),
        }
    }
    Ok(out)
}

fn splice_into(
    out: &mut Vec<Value>,
    spliced: Value,
    ctx: &EvaluationContext,
) -> Result<(), LustError> {
    match &spliced {
        Value::Vector(items) => out.extend(items.iter().cloned()),
        list if list.is_list() => match list.list_to_vec() {
            Some(items) => out.extend(items),
            None => return Err(ctx.type_mismatch("a proper list to splice", &spliced.describe())),
        },
        other => return Err(ctx.type_mismatch("a list or vector to splice", &other.describe())),
    }
    Ok(())
}
