//! # Logic and Comparison Operations
//!
//! All atoms in this module are pure functions.
//!
//! ## Atoms Provided
//!
//! - **Comparison**: `=`, `<`, `>`, `<=`, `>=`, `eq?`
//! - **Logic**: `not`
//! - **Predicates**: `nil?`, `pair?`
//!
//! `=` compares numbers by value across integers, ratios and floats and
//! everything else structurally; `eq?` is purely structural, so
//! `(eq? 1 1.0)` is false.

use std::cmp::Ordering;

use crate::{
    atoms::{
        helpers::{check_arity, check_min_arity, extract_numbers, Number},
        AtomRegistry, PureAtomFn,
    },
    errors::LustError,
    runtime::value::Value,
};

// ============================================================================
// COMPARISON HELPERS
// ============================================================================

fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (Number::from_value(a), Number::from_value(b)) {
        (Some(x), Some(y)) => x.num_eq(&y),
        _ => a == b,
    }
}

fn compare_chain(args: &[Value], name: &str, holds: fn(Ordering) -> bool) -> Result<Value, LustError> {
    check_min_arity(args, 2, name)?;
    let numbers = extract_numbers(args, name)?;
    let ordered = numbers
        .windows(2)
        .all(|w| w[0].compare(&w[1]).is_some_and(holds));
    Ok(Value::Bool(ordered))
}

// ============================================================================
// COMPARISON OPERATIONS
// ============================================================================

/// Returns true if all arguments are equal; numbers compare by value.
///
/// Usage: (= <a> <b> ...)
///
///   Returns: Bool
///
/// Example:
///   (= 1 1)   ; => true
///   (= 1 1.0) ; => true
///   (= 1 1 2) ; => false
pub const ATOM_NUM_EQ: PureAtomFn = |args| {
    check_min_arity(args, 2, "=")?;
    Ok(Value::Bool(
        args.windows(2).all(|w| loosely_equal(&w[0], &w[1])),
    ))
};

/// Returns true if each number is less than the next.
///
/// Usage: (< <a> <b> ...)
///
///   Returns: Bool
///
/// Example:
///   (< 1 2 3) ; => true
pub const ATOM_LT: PureAtomFn = |args| compare_chain(args, "<", Ordering::is_lt);

/// Returns true if each number is greater than the next.
///
/// Usage: (> <a> <b> ...)
///
///   Returns: Bool
pub const ATOM_GT: PureAtomFn = |args| compare_chain(args, ">", Ordering::is_gt);

/// Returns true if each number is at most the next.
///
/// Usage: (<= <a> <b> ...)
///
///   Returns: Bool
pub const ATOM_LTE: PureAtomFn = |args| compare_chain(args, "<=", Ordering::is_le);

/// Returns true if each number is at least the next.
///
/// Usage: (>= <a> <b> ...)
///
///   Returns: Bool
pub const ATOM_GTE: PureAtomFn = |args| compare_chain(args, ">=", Ordering::is_ge);

/// Structural equality of all arguments.
///
/// Usage: (eq? <a> <b> ...)
///
///   Returns: Bool
///
/// Example:
///   (eq? '(1 2) (list 1 2)) ; => true
///   (eq? 1 1.0)             ; => false
pub const ATOM_EQ: PureAtomFn = |args| {
    check_min_arity(args, 2, "eq?")?;
    Ok(Value::Bool(args.windows(2).all(|w| w[0] == w[1])))
};

// ============================================================================
// LOGIC AND PREDICATES
// ============================================================================

/// Logical negation: true only for `false` and `nil`.
///
/// Usage: (not <value>)
///
///   Returns: Bool
pub const ATOM_NOT: PureAtomFn = |args| {
    check_arity(args, 1, "not")?;
    Ok(Value::Bool(!args[0].is_truthy()))
};

/// True for `nil`, the empty list.
///
/// Usage: (nil? <value>)
pub const ATOM_IS_NIL: PureAtomFn = |args| {
    check_arity(args, 1, "nil?")?;
    Ok(Value::Bool(matches!(args[0], Value::Nil)))
};

/// True for a cons cell.
///
/// Usage: (pair? <value>)
pub const ATOM_IS_PAIR: PureAtomFn = |args| {
    check_arity(args, 1, "pair?")?;
    Ok(Value::Bool(matches!(args[0], Value::Pair(_))))
};

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

/// Registers all logic and comparison atoms with the given registry.
pub fn register_logic_atoms(registry: &mut AtomRegistry) {
    registry.register_pure("=", ATOM_NUM_EQ);
    registry.register_pure("<", ATOM_LT);
    registry.register_pure(">", ATOM_GT);
    registry.register_pure("<=", ATOM_LTE);
    registry.register_pure(">=", ATOM_GTE);
    registry.register_pure("eq?", ATOM_EQ);
    registry.register_pure("not", ATOM_NOT);
    registry.register_pure("nil?", ATOM_IS_NIL);
    registry.register_pure("pair?", ATOM_IS_PAIR);
}
