//! # Mathematical Operations
//!
//! Arithmetic atoms. All atoms in this module are pure functions.
//!
//! ## Atoms Provided
//!
//! - **Arithmetic**: `+`, `-`, `*`, `/`, `mod`
//!
//! ## Numeric Model
//!
//! - Integers are exact; `i64` overflow promotes to a big integer.
//! - `/` on exact numbers is exact, giving a ratio when it does not divide.
//! - Any float operand makes the whole operation float.

use crate::atoms::helpers::{
    check_arity, check_min_arity, extract_numbers, invalid_operation, type_error, AtomResult,
    Number,
};
use crate::atoms::{AtomRegistry, PureAtomFn};
use crate::errors::LustError;

// ============================================================================
// ARITHMETIC HELPERS
// ============================================================================

fn divide(acc: &Number, divisor: &Number) -> Result<Number, LustError> {
    acc.div(divisor)
        .ok_or_else(|| invalid_operation("/", "a zero divisor").with_help("division by zero"))
}

// ============================================================================
// ARITHMETIC OPERATIONS
// ============================================================================

/// Adds numbers.
///
/// Usage: (+ <a> <b> ...)
///   - <a>, <b>, ...: Numbers
///
///   Returns: Number (sum; 0 with no arguments)
///
/// Example:
///   (+ 1 2 3)   ; => 6
///   (+ 1/2 1/3) ; => 5/6
pub const ATOM_ADD: PureAtomFn = |args| {
    let numbers = extract_numbers(args, "+")?;
    let sum = numbers.iter().fold(Number::Int(0), |acc, n| acc.add(n));
    Ok(sum.into_value())
};

/// Subtracts numbers, or negates a single number.
///
/// Usage: (- <a> <b> ...)
///   - <a>, <b>, ...: Numbers
///
///   Returns: Number (a - b - ...)
///
/// Example:
///   (- 10 3) ; => 7
///   (- 5)    ; => -5
pub const ATOM_SUB: PureAtomFn = |args| {
    check_min_arity(args, 1, "-")?;
    let numbers = extract_numbers(args, "-")?;
    let result = match numbers.split_first() {
        Some((only, [])) => only.negate(),
        Some((first, rest)) => rest.iter().fold(first.clone(), |acc, n| acc.sub(n)),
        None => Number::Int(0),
    };
    Ok(result.into_value())
};

/// Multiplies numbers.
///
/// Usage: (* <a> <b> ...)
///   - <a>, <b>, ...: Numbers
///
///   Returns: Number (product; 1 with no arguments)
///
/// Example:
///   (* 2 3 4) ; => 24
pub const ATOM_MUL: PureAtomFn = |args| {
    let numbers = extract_numbers(args, "*")?;
    let product = numbers.iter().fold(Number::Int(1), |acc, n| acc.mul(n));
    Ok(product.into_value())
};

/// Divides numbers.
///
/// Usage: (/ <a> <b> ...)
///   - <a>, <b>, ...: Numbers (divisors must be non-zero)
///
///   Returns: Number (exact for exact operands)
///
/// Example:
///   (/ 10 2)  ; => 5
///   (/ 7 2)   ; => 7/2
///   (/ 7 2.0) ; => 3.5
pub const ATOM_DIV: PureAtomFn = |args| {
    check_min_arity(args, 1, "/")?;
    let numbers = extract_numbers(args, "/")?;
    let result = match numbers.split_first() {
        Some((only, [])) => divide(&Number::Int(1), only)?,
        Some((first, rest)) => rest
            .iter()
            .try_fold(first.clone(), |acc, divisor| divide(&acc, divisor))?,
        None => Number::Int(1),
    };
    Ok(result.into_value())
};

/// Euclidean modulo of two integers; the result is never negative.
///
/// Usage: (mod <a> <b>)
///   - <a>, <b>: Integers, <b> non-zero
///
///   Returns: Integer
///
/// Example:
///   (mod 10 3) ; => 1
///   (mod -7 3) ; => 2
pub const ATOM_MOD: PureAtomFn = |args| -> AtomResult {
    check_arity(args, 2, "mod")?;
    let numbers = extract_numbers(args, "mod")?;
    for (i, n) in numbers.iter().enumerate() {
        if !n.is_integer() {
            return Err(type_error("mod", i, "an integer", &args[i]));
        }
    }
    numbers[0]
        .rem_euclid(&numbers[1])
        .map(Number::into_value)
        .ok_or_else(|| invalid_operation("mod", "a zero divisor").with_help("modulo by zero"))
};

// ============================================================================
// REGISTRATION FUNCTION
// ============================================================================

/// Registers all mathematical atoms with the given registry.
pub fn register_math_atoms(registry: &mut AtomRegistry) {
    registry.register_pure("+", ATOM_ADD);
    registry.register_pure("-", ATOM_SUB);
    registry.register_pure("*", ATOM_MUL);
    registry.register_pure("/", ATOM_DIV);
    registry.register_pure("mod", ATOM_MOD);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::value::Value;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn integer_arithmetic_stays_exact() {
        assert_eq!(ATOM_ADD(&ints(&[1, 2, 3])).unwrap(), Value::Int(6));
        assert_eq!(ATOM_ADD(&[]).unwrap(), Value::Int(0));
        assert_eq!(ATOM_SUB(&ints(&[10, 3, 2])).unwrap(), Value::Int(5));
        assert_eq!(ATOM_SUB(&ints(&[5])).unwrap(), Value::Int(-5));
        assert_eq!(ATOM_MUL(&ints(&[2, 3, 4])).unwrap(), Value::Int(24));
    }

    #[test]
    fn floats_are_contagious() {
        let args = vec![Value::Int(1), Value::Float(0.5)];
        assert_eq!(ATOM_ADD(&args).unwrap(), Value::Float(1.5));
    }

    #[test]
    fn division_is_exact() {
        assert_eq!(ATOM_DIV(&ints(&[10, 2])).unwrap(), Value::Int(5));
        assert_eq!(ATOM_DIV(&ints(&[7, 2])).unwrap().to_string(), "7/2");
        assert_eq!(ATOM_DIV(&ints(&[2])).unwrap().to_string(), "1/2");
        assert_eq!(
            ATOM_DIV(&[Value::Int(7), Value::Float(2.0)]).unwrap(),
            Value::Float(3.5)
        );
        assert!(ATOM_DIV(&ints(&[1, 0])).is_err());
    }

    #[test]
    fn modulo_is_euclidean() {
        assert_eq!(ATOM_MOD(&ints(&[10, 3])).unwrap(), Value::Int(1));
        assert_eq!(ATOM_MOD(&ints(&[-7, 3])).unwrap(), Value::Int(2));
        assert!(ATOM_MOD(&ints(&[1, 0])).is_err());
        let err = ATOM_MOD(&[Value::Float(1.5), Value::Int(2)]).unwrap_err();
        assert_eq!(err.code(), "lust::runtime::type_mismatch");
    }

    #[test]
    fn overflow_promotes_to_big_integers() {
        let sum = ATOM_ADD(&ints(&[i64::MAX, 1])).unwrap();
        assert_eq!(sum.to_string(), "9223372036854775808");
        let back = ATOM_SUB(&[sum, Value::Int(1)]).unwrap();
        assert_eq!(back, Value::Int(i64::MAX));
        let err = ATOM_ADD(&[Value::Int(1), Value::string("x")]).unwrap_err();
        assert_eq!(err.code(), "lust::runtime::type_mismatch");
    }
}
