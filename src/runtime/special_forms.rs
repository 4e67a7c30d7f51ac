//! Special forms.
//!
//! Forms whose arguments are not evaluated up front. Each receives the
//! unevaluated argument list and either finishes with a value or hands a
//! tail form back to the evaluator loop.

use std::collections::HashMap;
use std::rc::Rc;

use once_cell::sync::Lazy;

use crate::engine::EvaluationContext;
use crate::errors::{ErrorReporting, LustError};
use crate::runtime::env::Env;
use crate::runtime::eval::{apply, eval, eval_body, Trampoline};
use crate::runtime::value::{Lambda, ParamList, Record, RecordVariant, Value};
use crate::runtime::{modules, pattern, quasiquote};
use crate::syntax::{keywords, Symbol};

pub type SpecialForm =
    fn(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError>;

static SPECIAL_FORMS: Lazy<HashMap<Symbol, SpecialForm>> = Lazy::new(|| {
    let kw = keywords();
    let table: [(Symbol, SpecialForm); 18] = [
        (kw.quote, sf_quote),
        (kw.quasiquote, sf_quasiquote),
        (kw.unquote, sf_unquote),
        (kw.unquote_splicing, sf_unquote),
        (kw.varg, sf_varg),
        (kw.if_, sf_if),
        (kw.begin, sf_begin),
        (kw.let_, sf_let),
        (kw.let_mut, sf_let_mut),
        (kw.set, sf_set),
        (kw.lambda, sf_lambda),
        (kw.macro_, sf_macro),
        (kw.match_, sf_match),
        (kw.type_, sf_type),
        (kw.module, sf_module),
        (kw.use_, sf_use),
        (kw.dot, sf_dot),
        (kw.apply, sf_apply),
    ];
    table.into_iter().collect()
});

pub fn lookup(name: Symbol) -> Option<SpecialForm> {
    SPECIAL_FORMS.get(&name).copied()
}

pub fn is_special_form(name: Symbol) -> bool {
    SPECIAL_FORMS.contains_key(&name)
}

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn arguments(args: &Value, form: &str) -> Result<Vec<Value>, LustError> {
    args.expect_list(&format!("`{}` arguments", form))
}

fn exact(
    args: &[Value],
    count: usize,
    form: &str,
    ctx: &EvaluationContext,
) -> Result<(), LustError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(ctx
            .arity_mismatch(&count.to_string(), args.len())
            .with_help(format!("`{}` takes {} argument(s)", form, count)))
    }
}

fn at_least(
    args: &[Value],
    count: usize,
    form: &str,
    ctx: &EvaluationContext,
) -> Result<(), LustError> {
    if args.len() >= count {
        Ok(())
    } else {
        Err(ctx
            .arity_mismatch(&format!("at least {}", count), args.len())
            .with_help(format!("`{}` takes at least {} argument(s)", form, count)))
    }
}

fn expect_symbol(value: &Value, what: &str, ctx: &EvaluationContext) -> Result<Symbol, LustError> {
    value
        .as_symbol()
        .ok_or_else(|| ctx.type_mismatch(what, &value.describe()))
}

/// Give an anonymous closure the name it is being bound to.
fn named(value: Value, name: Symbol) -> Value {
    match &value {
        Value::Closure(lambda) if lambda.name.is_none() => Value::Closure(Rc::new(Lambda {
            name: Some(name),
            params: lambda.params.clone(),
            body: lambda.body.clone(),
            env: lambda.env.clone(),
        })),
        _ => value,
    }
}

// ============================================================================
// QUOTING
// ============================================================================

fn sf_quote(args: &Value, _env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "quote")?;
    exact(&args, 1, "quote", ctx)?;
    Ok(Trampoline::Value(args[0].clone()))
}

fn sf_quasiquote(
    args: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
) -> Result<Trampoline, LustError> {
    let args = arguments(args, "quasiquote")?;
    exact(&args, 1, "quasiquote", ctx)?;
    quasiquote::quasiquote(&args[0], env, ctx).map(Trampoline::Value)
}

fn sf_unquote(_args: &Value, _env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    Err(ctx.invalid_operation("unquote", "code outside a quasiquote template"))
}

fn sf_varg(_args: &Value, _env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    Err(ctx.invalid_operation("variadic marker", "code outside a parameter list"))
}

// ============================================================================
// CONTROL
// ============================================================================

fn sf_if(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "if")?;
    let (condition, then_branch, else_branch) = match args.as_slice() {
        [c, t] => (c, t, None),
        [c, t, e] => (c, t, Some(e)),
        _ => {
            return Err(ctx
                .arity_mismatch("2 or 3", args.len())
                .with_help("usage: (if condition then else)"))
        }
    };
    if eval(condition, env, ctx)?.is_truthy() {
        Ok(Trampoline::Eval(then_branch.clone(), env.clone()))
    } else {
        match else_branch {
            Some(branch) => Ok(Trampoline::Eval(branch.clone(), env.clone())),
            None => Ok(Trampoline::Value(Value::Nil)),
        }
    }
}

fn sf_begin(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let body = arguments(args, "begin")?;
    eval_body(&body, env, ctx)
}

fn sf_match(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "match")?;
    at_least(&args, 1, "match", ctx)?;
    pattern::eval_match(&args, env, ctx)
}

fn sf_apply(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "apply")?;
    exact(&args, 2, "apply", ctx)?;
    let callee = eval(&args[0], env, ctx)?;
    let arg_values = match eval(&args[1], env, ctx)? {
        Value::Vector(items) => items.iter().cloned().collect(),
        list => list.expect_list("`apply`")?,
    };
    apply(&callee, arg_values, ctx)
}

// ============================================================================
// BINDING
// ============================================================================

fn sf_let(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    bind_form(args, env, ctx, false)
}

fn sf_let_mut(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    bind_form(args, env, ctx, true)
}

/// `(let name expr)`, `(let (name params...) body...)` and
/// `(let ((name expr)...) body...)`; `let!` makes the bindings mutable.
fn bind_form(
    args: &Value,
    env: &Env,
    ctx: &mut EvaluationContext,
    mutable: bool,
) -> Result<Trampoline, LustError> {
    let keyword = if mutable { "let!" } else { "let" };
    let args = arguments(args, keyword)?;
    at_least(&args, 1, keyword, ctx)?;

    match &args[0] {
        Value::Symbol(name) => {
            exact(&args, 2, keyword, ctx)?;
            let value = named(eval(&args[1], env, ctx)?, *name);
            env.define(*name, value, mutable);
            Ok(Trampoline::Value(Value::Nil))
        }

        Value::Pair(signature) if matches!(signature.head, Value::Symbol(_)) => {
            let name = expect_symbol(&signature.head, "function name", ctx)?;
            let params = ParamList::parse(&signature.tail)?;
            // Reserve the slot first so the closure's environment already
            // contains its own name.
            let slot = env.reserve(name, mutable);
            slot.set(Value::Closure(Rc::new(Lambda {
                name: Some(name),
                params,
                body: Rc::from(&args[1..]),
                env: env.clone(),
            })));
            Ok(Trampoline::Value(Value::Nil))
        }

        bindings if bindings.is_list() => {
            let scope = env.child();
            for binding in bindings.expect_list(&format!("`{}` bindings", keyword))? {
                match binding.list_to_vec().as_deref() {
                    Some([Value::Symbol(name), expr]) => {
                        let value = named(eval(expr, &scope, ctx)?, *name);
                        scope.define(*name, value, mutable);
                    }
                    _ => return Err(ctx.type_mismatch("a (name expr) binding", &binding.describe())),
                }
            }
            eval_body(&args[1..], &scope, ctx)
        }

        other => Err(ctx.type_mismatch(
            "a name, a (name params...) signature, or a binding list",
            &other.describe(),
        )),
    }
}

fn sf_set(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "set!")?;
    exact(&args, 2, "set!", ctx)?;
    let name = expect_symbol(&args[0], "variable name", ctx)?;
    let value = eval(&args[1], env, ctx)?;
    env.assign(name, value)?;
    Ok(Trampoline::Value(Value::Nil))
}

fn sf_lambda(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "lambda")?;
    at_least(&args, 1, "lambda", ctx)?;
    let params = ParamList::parse(&args[0])?;
    Ok(Trampoline::Value(Value::Closure(Rc::new(Lambda {
        name: None,
        params,
        body: Rc::from(&args[1..]),
        env: env.clone(),
    }))))
}

/// `(macro (name params...) body...)`
fn sf_macro(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "macro")?;
    at_least(&args, 1, "macro", ctx)?;
    let Value::Pair(signature) = &args[0] else {
        return Err(ctx.type_mismatch("a (name params...) signature", &args[0].describe()));
    };
    let name = expect_symbol(&signature.head, "macro name", ctx)?;
    let params = ParamList::parse(&signature.tail)?;
    env.define(
        name,
        Value::Macro(Rc::new(Lambda {
            name: Some(name),
            params,
            body: Rc::from(&args[1..]),
            env: env.clone(),
        })),
        false,
    );
    Ok(Trampoline::Value(Value::Nil))
}

/// `(type Name (Tag field...) Tag ...)`: nullary tags bind to their single
/// record value, the others to constructors.
fn sf_type(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "type")?;
    at_least(&args, 2, "type", ctx)?;
    let type_name = expect_symbol(&args[0], "type name", ctx)?;

    for declaration in &args[1..] {
        let (tag, fields) = match declaration {
            Value::Symbol(tag) => (*tag, Vec::new()),
            Value::Pair(_) => {
                let parts = declaration.expect_list("a variant declaration")?;
                let tag = expect_symbol(&parts[0], "variant tag", ctx)?;
                let fields = parts[1..]
                    .iter()
                    .map(|field| expect_symbol(field, "field name", ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                (tag, fields)
            }
            other => return Err(ctx.type_mismatch("a variant declaration", &other.describe())),
        };
        let variant = Rc::new(RecordVariant {
            type_name,
            tag,
            fields,
        });
        let value = if variant.fields.is_empty() {
            Value::Record(Rc::new(Record {
                variant,
                values: Vec::new(),
            }))
        } else {
            Value::Constructor(variant)
        };
        env.define(tag, value, false);
    }
    Ok(Trampoline::Value(Value::Nil))
}

// ============================================================================
// MODULES AND FIELD ACCESS
// ============================================================================

fn sf_module(args: &Value, _env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "module")?;
    at_least(&args, 1, "module", ctx)?;
    let name = expect_symbol(&args[0], "module name", ctx)?;
    modules::define_module(name, &args[1..], ctx)?;
    Ok(Trampoline::Value(Value::Nil))
}

fn sf_use(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, "use")?;
    exact(&args, 1, "use", ctx)?;
    let name = expect_symbol(&args[0], "module name", ctx)?;
    modules::use_module(name, env, ctx)?;
    Ok(Trampoline::Value(Value::Nil))
}

/// `(. target key)`, also written `target.key`.
fn sf_dot(args: &Value, env: &Env, ctx: &mut EvaluationContext) -> Result<Trampoline, LustError> {
    let args = arguments(args, ".")?;
    exact(&args, 2, ".", ctx)?;
    let target = match &args[0] {
        Value::Symbol(sym) => modules::resolve_qualifier(*sym, env, ctx)?,
        form => eval(form, env, ctx)?,
    };
    let key = eval(&args[1], env, ctx)?;
    access_field(&target, &key, ctx).map(Trampoline::Value)
}

pub fn access_field(
    target: &Value,
    key: &Value,
    ctx: &EvaluationContext,
) -> Result<Value, LustError> {
    let kw = keywords();
    match target {
        Value::Map(map) => Ok(map.get(key).cloned().unwrap_or_default()),

        Value::Module(module) => {
            let field = expect_symbol(key, "a symbol naming a module member", ctx)?;
            module
                .env
                .lookup_local(field)
                .ok_or_else(|| ctx.unbound_variable(&format!("{}.{}", module.name, field)))
        }

        Value::Record(record) => {
            let field = expect_symbol(key, "a field name", ctx)?;
            record.get(field).cloned().ok_or_else(|| {
                ctx.type_mismatch(
                    &format!("a field of `{}`", record.variant.tag),
                    &key.describe(),
                )
            })
        }

        Value::Pair(pair) => match key.as_symbol() {
            Some(field) if field == kw.head => Ok(pair.head.clone()),
            Some(field) if field == kw.tail => Ok(pair.tail.clone()),
            _ => Err(ctx.type_mismatch("`head` or `tail`", &key.describe())),
        },

        Value::Vector(items) => match key {
            Value::Int(i) => Ok(usize::try_from(*i)
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default()),
            other => Err(ctx.type_mismatch("an integer index", &other.describe())),
        },

        other => Err(ctx.type_mismatch(
            "a map, record, module, pair or vector",
            &other.describe(),
        )),
    }
}
