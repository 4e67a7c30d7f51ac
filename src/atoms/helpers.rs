//! # Atom Helper Infrastructure
//!
//! Shared infrastructure used by all atom implementations: arity checks,
//! typed argument extraction, and error construction.

use crate::errors::{ErrorKind, LustError};
use crate::runtime::value::{MapValue, Value};

pub use crate::runtime::numeric::Number;

// ============================================================================
// TYPE ALIASES AND CORE TYPES
// ============================================================================

/// Return type of every atom
pub type AtomResult = Result<Value, LustError>;

// ============================================================================
// TRAIT-BASED TYPE EXTRACTION
// ============================================================================

/// Extract a typed view of an argument, failing with a type mismatch that
/// names the atom and argument position.
pub trait ExtractValue<T> {
    fn extract(&self, name: &str, index: usize) -> Result<T, LustError>;
}

impl ExtractValue<Number> for Value {
    fn extract(&self, name: &str, index: usize) -> Result<Number, LustError> {
        Number::from_value(self).ok_or_else(|| type_error(name, index, "a number", self))
    }
}

impl ExtractValue<i64> for Value {
    fn extract(&self, name: &str, index: usize) -> Result<i64, LustError> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(type_error(name, index, "an integer", other)),
        }
    }
}

impl ExtractValue<MapValue> for Value {
    fn extract(&self, name: &str, index: usize) -> Result<MapValue, LustError> {
        match self {
            Value::Map(map) => Ok(map.clone()),
            other => Err(type_error(name, index, "a map", other)),
        }
    }
}

/// Extract every argument as a number.
pub fn extract_numbers(args: &[Value], name: &str) -> Result<Vec<Number>, LustError> {
    let mut numbers = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        let number: Number = arg.extract(name, i)?;
        numbers.push(number);
    }
    Ok(numbers)
}

/// Elements of a proper list or a vector.
pub fn extract_sequence(value: &Value, name: &str, index: usize) -> Result<Vec<Value>, LustError> {
    match value {
        Value::Vector(items) => Ok(items.iter().cloned().collect()),
        list => list
            .list_to_vec()
            .ok_or_else(|| type_error(name, index, "a list or vector", list)),
    }
}

// ============================================================================
// ARITY CHECKS
// ============================================================================

pub fn check_arity(args: &[Value], expected: usize, name: &str) -> Result<(), LustError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(arity_error(name, expected.to_string(), args.len()))
    }
}

pub fn check_min_arity(args: &[Value], minimum: usize, name: &str) -> Result<(), LustError> {
    if args.len() >= minimum {
        Ok(())
    } else {
        Err(arity_error(name, format!("at least {}", minimum), args.len()))
    }
}

// ============================================================================
// ERROR CONSTRUCTION UTILITIES
// ============================================================================

/// Creates an arity error for atoms with consistent messaging
pub fn arity_error(name: &str, expected: impl Into<String>, actual: usize) -> LustError {
    LustError::new(ErrorKind::ArityMismatch {
        expected: expected.into(),
        actual,
    })
    .with_help(format!("in call to `{}`", name))
}

/// Creates a type error for atoms with consistent messaging
pub fn type_error(name: &str, index: usize, expected: &str, found: &Value) -> LustError {
    LustError::new(ErrorKind::TypeMismatch {
        expected: expected.to_string(),
        actual: found.describe(),
    })
    .with_help(format!("argument {} of `{}`", index + 1, name))
}

/// Creates an invalid-operation error for atoms
pub fn invalid_operation(operation: &str, operand: &str) -> LustError {
    LustError::new(ErrorKind::InvalidOperation {
        operation: operation.to_string(),
        operand_type: operand.to_string(),
    })
}
