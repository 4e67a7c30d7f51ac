//! The expansion engine: head rewriting to a fixed point, then a walk over
//! the children that knows which positions of each special form hold code.

use std::rc::Rc;

use tracing::trace;

use crate::engine::EvaluationContext;
use crate::errors::{ErrorKind, LustError};
use crate::runtime::env::Env;
use crate::runtime::eval::{eval_body, force, STACK_RED_ZONE, STACK_SEGMENT_SIZE};
use crate::runtime::quasiquote::single_argument;
use crate::runtime::special_forms::is_special_form;
use crate::runtime::value::{Lambda, Value};
use crate::syntax::{keywords, Symbol};

// =============================
// Public API for macro expansion
// =============================

/// Expand every macro call in `form`, resolving macros through `env`.
///
/// Only macro rewrites count towards the nesting limit; deeply nested
/// code with no macro calls expands at any depth.
pub fn expand(form: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Value, LustError> {
    expand_form(form, env, ctx, 0)
}

/// Run one macro on unevaluated argument forms, returning its expansion.
pub fn expand_call(
    mac: &Lambda,
    args: Vec<Value>,
    ctx: &mut EvaluationContext,
) -> Result<Value, LustError> {
    let name = macro_name(mac);
    if !mac.params.accepts(args.len()) {
        return Err(expansion_error(
            &name,
            format!(
                "expected {} argument(s), got {}",
                mac.params.arity_string(),
                args.len()
            ),
        ));
    }

    let scope = mac.env.child();
    for (param, value) in mac.params.bind(args) {
        scope.define(param, value, false);
    }
    let step = eval_body(&mac.body, &scope, ctx)?;
    let expansion = force(step, ctx)?;
    trace!(name = %name, expansion = %expansion, "expanded macro call");
    Ok(expansion)
}

/// The macro named by the head of `form`, if any: a symbol bound to a macro,
/// or `Module.name` naming a module member that is one.
pub fn macro_at_head(form: &Value, env: &Env, ctx: &EvaluationContext) -> Option<Rc<Lambda>> {
    let Value::Pair(pair) = form else {
        return None;
    };
    match &pair.head {
        Value::Symbol(sym) if !is_special_form(*sym) => match env.lookup(*sym) {
            Some(Value::Macro(mac)) => Some(mac),
            _ => None,
        },
        qualified if qualified.is_form(keywords().dot) => qualified_macro(qualified, env, ctx),
        _ => None,
    }
}

fn qualified_macro(form: &Value, env: &Env, ctx: &EvaluationContext) -> Option<Rc<Lambda>> {
    let parts = form.list_to_vec()?;
    let [_, Value::Symbol(module), key] = parts.as_slice() else {
        return None;
    };
    if env.is_bound(*module) {
        return None;
    }
    let member = single_argument(key, keywords().quote)?.as_symbol()?;
    match ctx.modules.get(*module)?.env.lookup_local(member) {
        Some(Value::Macro(mac)) => Some(mac),
        _ => None,
    }
}

// =============================
// Internal helpers
// =============================

fn macro_name(mac: &Lambda) -> String {
    mac.name
        .map(|name| name.as_string())
        .unwrap_or_else(|| "<anonymous>".to_string())
}

fn expansion_error(name: &str, reason: impl Into<String>) -> LustError {
    LustError::new(ErrorKind::MacroExpansion {
        macro_name: name.to_string(),
        reason: reason.into(),
    })
}

fn expand_form(
    form: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT_SIZE, || {
        rewrite_form(form, env, ctx, depth)
    })
}

/// `depth` counts the macro rewrites enclosing `form`.
fn rewrite_form(
    form: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    if depth > ctx.max_macro_expansions {
        let name = form
            .head_symbol()
            .map(|sym| sym.as_string())
            .unwrap_or_else(|| "<form>".to_string());
        return Err(expansion_error(
            &name,
            format!("expansion nested deeper than {} levels", ctx.max_macro_expansions),
        ));
    }

    let mut current = form.clone();
    let mut rewrites = 0;
    while let Some(mac) = macro_at_head(&current, env, ctx) {
        rewrites += 1;
        if rewrites > ctx.max_macro_expansions {
            return Err(expansion_error(
                &macro_name(&mac),
                format!(
                    "no fixed point after {} rewrites",
                    ctx.max_macro_expansions
                ),
            ));
        }
        let Value::Pair(pair) = &current else {
            break;
        };
        let args = pair.tail.list_to_vec().ok_or_else(|| {
            expansion_error(&macro_name(&mac), "macro call has an improper argument list")
        })?;
        current = expand_call(&mac, args, ctx)?;
    }

    let depth = if rewrites > 0 { depth + 1 } else { depth };
    expand_children(&current, env, ctx, depth)
}

fn expand_children(
    form: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    match form {
        Value::Pair(pair) => {
            let Some(head) = pair.head.as_symbol().filter(|sym| is_special_form(*sym)) else {
                return expand_list(form, 0, env, ctx, depth);
            };
            let kw = keywords();
            if head == kw.quote {
                Ok(form.to_datum())
            } else if head == kw.type_ || head == kw.module || head == kw.use_ {
                Ok(form.clone())
            } else if head == kw.quasiquote {
                match single_argument(form, kw.quasiquote) {
                    Some(template) => Ok(Value::list(vec![
                        Value::Symbol(kw.quasiquote),
                        expand_template(&template, 1, env, ctx, depth)?,
                    ])),
                    None => Ok(form.clone()),
                }
            } else if head == kw.lambda || head == kw.macro_ {
                expand_list(form, 2, env, ctx, depth)
            } else if head == kw.let_ || head == kw.let_mut {
                expand_let(form, env, ctx, depth)
            } else if head == kw.match_ {
                expand_match(form, env, ctx, depth)
            } else {
                expand_list(form, 1, env, ctx, depth)
            }
        }

        Value::Vector(items) => Ok(Value::Vector(
            items
                .iter()
                .map(|item| expand_form(item, env, ctx, depth))
                .collect::<Result<_, _>>()?,
        )),

        Value::SetLiteral(items) => Ok(Value::SetLiteral(
            items
                .iter()
                .map(|item| expand_form(item, env, ctx, depth))
                .collect::<Result<Vec<_>, _>>()?
                .into(),
        )),

        Value::MapLiteral(entries) => {
            let mut expanded = Vec::with_capacity(entries.len());
            for (key, value) in entries.iter() {
                expanded.push((
                    expand_form(key, env, ctx, depth)?,
                    expand_form(value, env, ctx, depth)?,
                ));
            }
            Ok(Value::MapLiteral(expanded.into()))
        }

        other => Ok(other.clone()),
    }
}

/// Expand every element of a list after the first `keep` ones.
fn expand_list(
    form: &Value,
    keep: usize,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    let mut iter = form.iter_list();
    let mut items = Vec::new();
    for (i, item) in iter.by_ref().enumerate() {
        if i < keep {
            items.push(item.clone());
        } else {
            items.push(expand_form(item, env, ctx, depth)?);
        }
    }
    Ok(Value::list_with_tail(items, iter.remainder().clone()))
}

/// `(let name expr)`, `(let (name params...) body...)`,
/// `(let ((name expr)...) body...)`.
fn expand_let(
    form: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    let Some(parts) = form.list_to_vec() else {
        return Ok(form.clone());
    };
    match parts.get(1) {
        Some(Value::Symbol(_)) => expand_list(form, 2, env, ctx, depth),
        Some(Value::Pair(signature)) if matches!(signature.head, Value::Symbol(_)) => {
            expand_list(form, 2, env, ctx, depth)
        }
        Some(bindings) if bindings.is_list() => {
            let mut expanded_bindings = Vec::new();
            for binding in bindings.iter_list() {
                match binding.list_to_vec().as_deref() {
                    Some([name, expr]) => expanded_bindings.push(Value::list(vec![
                        name.clone(),
                        expand_form(expr, env, ctx, depth)?,
                    ])),
                    _ => expanded_bindings.push(binding.clone()),
                }
            }
            let mut items = vec![parts[0].clone(), Value::list(expanded_bindings)];
            for body_form in &parts[2..] {
                items.push(expand_form(body_form, env, ctx, depth)?);
            }
            Ok(Value::list(items))
        }
        _ => Ok(form.clone()),
    }
}

/// `(match expr (pattern body...)...)`: patterns are data.
fn expand_match(
    form: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    let Some(parts) = form.list_to_vec() else {
        return Ok(form.clone());
    };
    let mut items = vec![parts[0].clone()];
    if let Some(scrutinee) = parts.get(1) {
        items.push(expand_form(scrutinee, env, ctx, depth)?);
    }
    for clause in parts.iter().skip(2) {
        match clause.list_to_vec() {
            Some(clause_parts) if !clause_parts.is_empty() => {
                let mut expanded = vec![clause_parts[0].clone()];
                for body_form in &clause_parts[1..] {
                    expanded.push(expand_form(body_form, env, ctx, depth)?);
                }
                items.push(Value::list(expanded));
            }
            _ => items.push(clause.clone()),
        }
    }
    Ok(Value::list(items))
}

/// Walk a quasiquote template, expanding only the code at unquote points of
/// the outermost level.
fn expand_template(
    template: &Value,
    level: usize,
    env: &Env,
    ctx: &mut EvaluationContext,
    depth: usize,
) -> Result<Value, LustError> {
    let kw = keywords();
    let rewrap = |head: Symbol, inner: Value| Value::list(vec![Value::Symbol(head), inner]);

    match template {
        Value::Pair(_) => {
            for marker in [kw.unquote, kw.unquote_splicing] {
                if let Some(inner) = single_argument(template, marker) {
                    let inner = if level == 1 {
                        expand_form(&inner, env, ctx, depth)?
                    } else {
                        expand_template(&inner, level - 1, env, ctx, depth)?
                    };
                    return Ok(rewrap(marker, inner));
                }
            }
            if let Some(inner) = single_argument(template, kw.quasiquote) {
                return Ok(rewrap(
                    kw.quasiquote,
                    expand_template(&inner, level + 1, env, ctx, depth)?,
                ));
            }

            let mut iter = template.iter_list();
            let mut items = Vec::new();
            for item in iter.by_ref() {
                items.push(expand_template(item, level, env, ctx, depth)?);
            }
            let tail = match iter.remainder() {
                Value::Nil => Value::Nil,
                rest => expand_template(rest, level, env, ctx, depth)?,
            };
            Ok(Value::list_with_tail(items, tail))
        }

        Value::Vector(items) => Ok(Value::Vector(
            items
                .iter()
                .map(|item| expand_template(item, level, env, ctx, depth))
                .collect::<Result<_, _>>()?,
        )),

        Value::SetLiteral(items) => Ok(Value::SetLiteral(
            items
                .iter()
                .map(|item| expand_template(item, level, env, ctx, depth))
                .collect::<Result<Vec<_>, _>>()?
                .into(),
        )),

        Value::MapLiteral(entries) => {
            let mut expanded = Vec::with_capacity(entries.len());
            for (key, value) in entries.iter() {
                expanded.push((
                    expand_template(key, level, env, ctx, depth)?,
                    expand_template(value, level, env, ctx, depth)?,
                ));
            }
            Ok(Value::MapLiteral(expanded.into()))
        }

        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionPipeline;
    use crate::syntax::parser::read_str;

    fn pipeline_with(definitions: &str) -> ExecutionPipeline {
        let mut pipeline = ExecutionPipeline::new();
        pipeline.execute_source("defs", definitions).unwrap();
        pipeline
    }

    fn expand_str(pipeline: &mut ExecutionPipeline, source: &str) -> Result<String, LustError> {
        let form = read_str(source).unwrap().remove(0);
        let env = pipeline.global_env().clone();
        expand(&form, &env, &mut pipeline.context).map(|v| v.to_string())
    }

    #[test]
    fn rewrites_to_a_fixed_point() {
        let mut pipeline = pipeline_with(
            "(macro (unless c body) `(if ,c nil ,body))
             (macro (when-not c body) `(unless ,c ,body))",
        );
        assert_eq!(
            expand_str(&mut pipeline, "(when-not x 1)").unwrap(),
            "(if x nil 1)"
        );
    }

    #[test]
    fn quoted_forms_are_left_alone() {
        let mut pipeline = pipeline_with("(macro (m) 1)");
        assert_eq!(expand_str(&mut pipeline, "'(m)").unwrap(), "(quote (m))");
        assert_eq!(
            expand_str(&mut pipeline, "`((m) ,(m))").unwrap(),
            "(quasiquote ((m) (unquote 1)))"
        );
    }

    #[test]
    fn match_patterns_are_not_expanded() {
        let mut pipeline = pipeline_with("(macro (m) 1)");
        assert_eq!(
            expand_str(&mut pipeline, "(match x ((m) (m)))").unwrap(),
            "(match x ((m) 1))"
        );
    }

    #[test]
    fn arity_mismatch_is_an_expansion_error() {
        let mut pipeline = pipeline_with("(macro (two a b) a)");
        let err = expand_str(&mut pipeline, "(two 1)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MacroExpansion { .. }));
    }

    #[test]
    fn self_expansion_hits_the_bound() {
        let mut pipeline = pipeline_with("(macro (forever x) `(forever ,x))");
        let err = expand_str(&mut pipeline, "(forever 1)").unwrap_err();
        assert_eq!(err.code(), "lust::expansion::macro_expansion");
    }

    #[test]
    fn nested_growth_hits_the_bound() {
        let mut pipeline = pipeline_with("(macro (grow x) `(list (grow ,x)))");
        pipeline.context.max_macro_expansions = 40;
        let err = expand_str(&mut pipeline, "(grow 1)").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MacroExpansion { .. }));
    }

    #[test]
    fn deep_code_without_macros_expands() {
        let mut pipeline = pipeline_with("(macro (m) 1)");
        pipeline.context.max_macro_expansions = 40;
        let source = format!("{}0{}", "(+ 1 ".repeat(200), ")".repeat(200));
        let expanded = expand_str(&mut pipeline, &source).unwrap();
        assert_eq!(expanded, source);
    }

    #[test]
    fn collection_forms_expand_in_place() {
        let mut pipeline = pipeline_with("(macro (m) 1)");
        assert_eq!(
            expand_str(&mut pipeline, "{(m) (m) (m) 2}").unwrap(),
            "{1 1 1 2}"
        );
        assert_eq!(expand_str(&mut pipeline, "#{(m) (m)}").unwrap(), "#{1 1}");
    }

    #[test]
    fn quoted_collection_forms_become_data() {
        let mut pipeline = pipeline_with("(macro (m) 1)");
        let form = read_str("'#{a a b}").unwrap().remove(0);
        let env = pipeline.global_env().clone();
        let expanded = expand(&form, &env, &mut pipeline.context).unwrap();
        let parts = expanded.list_to_vec().unwrap();
        assert!(matches!(&parts[1], Value::Set(items) if items.len() == 2));
    }
}
