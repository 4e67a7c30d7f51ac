//! # String and Symbol Operations
//!
//! ## Atoms Provided
//!
//! - `str`: concatenate display forms into a string
//! - `symbol`: intern a string as a symbol
//! - `gensym`: a fresh, never-before-returned symbol (stateful)

use crate::atoms::helpers::{arity_error, check_arity, type_error};
use crate::atoms::{AtomRegistry, PureAtomFn, StatefulAtomFn};
use crate::runtime::value::Value;

/// Concatenates the display forms of its arguments.
///
/// Usage: (str <a> <b> ...)
///
///   Returns: String
///
/// Example:
///   (str "n = " 42) ; => "n = 42"
pub const ATOM_STR: PureAtomFn = |args| {
    let text: String = args.iter().map(Value::display_string).collect();
    Ok(Value::string(&text))
};

/// Interns a string (or passes a symbol through).
///
/// Usage: (symbol <name>)
///
/// Example:
///   (symbol "abc") ; => abc
pub const ATOM_SYMBOL: PureAtomFn = |args| {
    check_arity(args, 1, "symbol")?;
    match &args[0] {
        Value::String(name) => Ok(Value::symbol(name)),
        Value::Symbol(_) => Ok(args[0].clone()),
        other => Err(type_error("symbol", 0, "a string", other)),
    }
};

/// Returns a fresh symbol, for macros that introduce bindings.
///
/// Usage: (gensym [prefix])
///
/// Example:
///   (gensym "tmp") ; => tmp__1
pub const ATOM_GENSYM: StatefulAtomFn = |args, context| {
    let prefix = match args {
        [] => "g".to_string(),
        [Value::String(s)] => s.to_string(),
        [Value::Symbol(s)] => s.as_string(),
        [other] => return Err(type_error("gensym", 0, "a string or symbol", other)),
        _ => return Err(arity_error("gensym", "0 or 1", args.len())),
    };
    Ok(Value::Symbol(context.next_gensym(&prefix)))
};

/// Registers all string atoms with the given registry.
pub fn register_string_atoms(registry: &mut AtomRegistry) {
    registry.register_pure("str", ATOM_STR);
    registry.register_pure("symbol", ATOM_SYMBOL);
    registry.register_stateful("gensym", ATOM_GENSYM);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_uses_display_forms() {
        let args = [Value::string("n = "), Value::Int(42), Value::symbol("x")];
        assert_eq!(ATOM_STR(&args).unwrap(), Value::string("n = 42x"));
    }

    #[test]
    fn symbol_interns_strings() {
        assert_eq!(
            ATOM_SYMBOL(&[Value::string("abc")]).unwrap(),
            Value::symbol("abc")
        );
        assert!(ATOM_SYMBOL(&[Value::Int(1)]).is_err());
    }
}
