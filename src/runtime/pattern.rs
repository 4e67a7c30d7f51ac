//! Pattern matching for `match`.
//!
//! A clause pattern is one of:
//! - `t` or `_`, matching anything;
//! - a variant tag, either declared with `type` or one of the builtin
//!   tags (`Nil`/`Empty`, `Pair`/`Cons`, and the kind tags `Int`, `Ratio`,
//!   `Float`, `Number`, `String`, `Symbol`, `Bool`, `Vector`, `Set`, `Map`,
//!   `Fn`);
//! - `(Tag name...)`, a tag whose fields are bound to the given names;
//! - a quoted datum or self-evaluating literal, matching by equality.
//!
//! A bare tag binds the variant's declared field names (`head` and `tail`
//! for pairs) in the clause body.

use crate::engine::EvaluationContext;
use crate::errors::{ErrorReporting, LustError};
use crate::runtime::env::Env;
use crate::runtime::eval::{eval, eval_body, Trampoline};
use crate::runtime::value::{RecordVariant, Value};
use crate::syntax::{keywords, Symbol};

type Bindings = Vec<(Symbol, Value)>;

/// `(match expr (pattern body...)...)`; no matching clause is a type mismatch.
pub fn eval_match(
    args: &[Value],
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Trampoline, LustError> {
    let (scrutinee, clauses) = args
        .split_first()
        .ok_or_else(|| ctx.arity_mismatch("at least 1", 0))?;
    let value = eval(scrutinee, env, ctx)?;

    for clause in clauses {
        let parts = clause.expect_list("a match clause")?;
        let Some((pattern, body)) = parts.split_first() else {
            return Err(ctx.type_mismatch("a (pattern body...) clause", &clause.describe()));
        };
        if let Some(bindings) = match_pattern(pattern, &value, env, ctx)? {
            let scope = if bindings.is_empty() {
                env.clone()
            } else {
                let scope = env.child();
                for (name, bound) in bindings {
                    scope.define(name, bound, false);
                }
                scope
            };
            return eval_body(body, &scope, ctx);
        }
    }

    Err(ctx
        .type_mismatch(
            &format!("a value matching one of {} clause(s)", clauses.len()),
            &value.describe(),
        )
        .with_help("add a `t` clause to handle every other value"))
}

/// Test one pattern; `Some(bindings)` on a match.
pub fn match_pattern(
    pattern: &Value,
    value: &Value,
    env: &Env,
    ctx: &EvaluationContext,
) -> Result<Option<Bindings>, LustError> {
    let kw = keywords();
    match pattern {
        Value::Symbol(tag) => match_tag(*tag, None, value, env, ctx),

        quoted if quoted.is_form(kw.quote) => {
            let datum = quoted
                .list_to_vec()
                .and_then(|parts| parts.get(1).map(Value::to_datum));
            Ok((datum.as_ref() == Some(value)).then(Vec::new))
        }

        Value::Pair(pair) => {
            let tag = pair
                .head
                .as_symbol()
                .ok_or_else(|| ctx.type_mismatch("a pattern tag", &pair.head.describe()))?;
            let names = pair
                .tail
                .expect_list("pattern field names")?
                .iter()
                .map(|name| {
                    name.as_symbol()
                        .ok_or_else(|| ctx.type_mismatch("a field name", &name.describe()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            match_tag(tag, Some(&names), value, env, ctx)
        }

        literal => Ok((literal.to_datum() == *value).then(Vec::new)),
    }
}

fn match_tag(
    tag: Symbol,
    names: Option<&[Symbol]>,
    value: &Value,
    env: &Env,
    ctx: &EvaluationContext,
) -> Result<Option<Bindings>, LustError> {
    let kw = keywords();
    if tag == kw.t || tag == kw.wildcard {
        return Ok(Some(Vec::new()));
    }

    // Declared variants shadow the builtin tags.
    let declared = match env.lookup(tag) {
        Some(Value::Constructor(variant)) => Some(variant),
        Some(Value::Record(record)) => Some(record.variant.clone()),
        _ => None,
    };
    if let Some(variant) = declared {
        let Value::Record(record) = value else {
            return Ok(None);
        };
        if !RecordVariant::same_variant(&variant, &record.variant) {
            return Ok(None);
        }
        return bind_fields(tag, &variant.fields, &record.values, names, ctx).map(Some);
    }

    let text = tag.as_string();
    let (matched, fields, values): (bool, Vec<Symbol>, Vec<Value>) = match (text.as_str(), value) {
        ("Nil" | "Empty", Value::Nil) => (true, Vec::new(), Vec::new()),
        ("Pair" | "Cons", Value::Pair(pair)) => (
            true,
            vec![kw.head, kw.tail],
            vec![pair.head.clone(), pair.tail.clone()],
        ),
        ("Nil" | "Empty" | "Pair" | "Cons", _) => (false, Vec::new(), Vec::new()),
        (kind, _) => match kind_matches(kind, value) {
            Some(matched) => (matched, Vec::new(), Vec::new()),
            None => return Err(unknown_tag(tag, env, ctx)),
        },
    };

    if !matched {
        return Ok(None);
    }
    bind_fields(tag, &fields, &values, names, ctx).map(Some)
}

/// A symbol that names no variant: a type mismatch when it is bound to an
/// ordinary value, unbound otherwise.
fn unknown_tag(tag: Symbol, env: &Env, ctx: &EvaluationContext) -> LustError {
    let help = "patterns are variant tags, literals, quoted data, or `t`";
    match env.lookup(tag) {
        Some(bound) => ctx
            .type_mismatch(
                "a variant tag",
                &format!("`{}`, a variable bound to {}", tag, bound.describe()),
            )
            .with_help(help),
        None => ctx.unbound_variable(&tag.as_string()).with_help(help),
    }
}

/// Builtin kind tags; `None` for unknown tags.
fn kind_matches(kind: &str, value: &Value) -> Option<bool> {
    let matched = match kind {
        "Int" => matches!(value, Value::Int(_) | Value::BigInt(_)),
        "Ratio" => matches!(value, Value::Ratio(_)),
        "Float" => matches!(value, Value::Float(_)),
        "Number" => matches!(
            value,
            Value::Int(_) | Value::BigInt(_) | Value::Ratio(_) | Value::Float(_)
        ),
        "String" => matches!(value, Value::String(_)),
        "Symbol" => matches!(value, Value::Symbol(_)),
        "Bool" => matches!(value, Value::Bool(_)),
        "Vector" => matches!(value, Value::Vector(_)),
        "Set" => matches!(value, Value::Set(_)),
        "Map" => matches!(value, Value::Map(_)),
        "Fn" => matches!(
            value,
            Value::Closure(_) | Value::Native(_) | Value::Constructor(_)
        ),
        _ => return None,
    };
    Some(matched)
}

fn bind_fields(
    tag: Symbol,
    declared: &[Symbol],
    values: &[Value],
    names: Option<&[Symbol]>,
    ctx: &EvaluationContext,
) -> Result<Bindings, LustError> {
    let names = names.unwrap_or(declared);
    if names.len() != values.len() {
        return Err(ctx
            .arity_mismatch(&values.len().to_string(), names.len())
            .with_help(format!("pattern `{}` binds one name per field", tag)));
    }
    Ok(names.iter().copied().zip(values.iter().cloned()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionPipeline;
    use crate::syntax::parser::read_str;

    fn check(pattern: &str, value: Value) -> Option<Bindings> {
        let pipeline = ExecutionPipeline::new();
        let pattern = read_str(pattern).unwrap().remove(0);
        match_pattern(&pattern, &value, pipeline.global_env(), &pipeline.context).unwrap()
    }

    #[test]
    fn wildcards_match_everything() {
        assert!(check("t", Value::Int(1)).is_some());
        assert!(check("_", Value::Nil).is_some());
    }

    #[test]
    fn pair_tag_binds_head_and_tail() {
        let value = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let bindings = check("Pair", value).unwrap();
        assert_eq!(bindings[0], (Symbol::new("head"), Value::Int(1)));
        assert_eq!(bindings[1].1.to_string(), "(2)");
        assert!(check("Pair", Value::Nil).is_none());
        assert!(check("Empty", Value::Nil).is_some());
    }

    #[test]
    fn explicit_names_rename_fields() {
        let value = Value::cons(Value::Int(1), Value::Nil);
        let bindings = check("(Cons x xs)", value).unwrap();
        assert_eq!(bindings[0].0, Symbol::new("x"));
        assert_eq!(bindings[1], (Symbol::new("xs"), Value::Nil));
    }

    #[test]
    fn literals_and_quoted_data_match_by_equality() {
        assert!(check("42", Value::Int(42)).is_some());
        assert!(check("42", Value::Int(7)).is_none());
        assert!(check("'done", Value::symbol("done")).is_some());
        assert!(check("\"x\"", Value::string("x")).is_some());
        assert!(check("Int", Value::Int(3)).is_some());
        assert!(check("String", Value::Int(3)).is_none());
    }

    #[test]
    fn quoted_collections_match_as_data() {
        let set: Value = Value::Set([Value::Int(1), Value::Int(2)].into_iter().collect());
        assert!(check("'#{2 1 1}", set).is_some());
        let half = crate::runtime::numeric::parse_exact("1/2").unwrap().into_value();
        assert!(check("Ratio", half.clone()).is_some());
        assert!(check("Number", half).is_some());
    }
}
