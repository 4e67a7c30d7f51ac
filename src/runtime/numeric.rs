//! The numeric tower.
//!
//! Integers are `i64` until an operation overflows, then they promote to
//! big integers. Integer division that is not exact produces a ratio.
//! Any float operand makes the result a float. Results are always
//! normalized, so a big integer that fits in `i64` becomes `Int` again and
//! a ratio with denominator one becomes an integer.

use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::runtime::value::Value;

// ============================================================================
// NUMBER TYPE
// ============================================================================

/// A numeric argument, lifted out of a `Value` for arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    Big(BigInt),
    Ratio(BigRational),
    Float(f64),
}

type BigOp = fn(BigInt, BigInt) -> BigInt;
type RatioOp = fn(BigRational, BigRational) -> BigRational;
type FloatOp = fn(f64, f64) -> f64;

impl Number {
    pub fn from_value(value: &Value) -> Option<Number> {
        match value {
            Value::Int(n) => Some(Number::Int(*n)),
            Value::BigInt(n) => Some(Number::Big(n.as_ref().clone())),
            Value::Ratio(r) => Some(Number::Ratio(r.as_ref().clone())),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self.normalize() {
            Number::Int(n) => Value::Int(n),
            Number::Big(n) => Value::BigInt(Rc::new(n)),
            Number::Ratio(r) => Value::Ratio(Rc::new(r)),
            Number::Float(x) => Value::Float(x),
        }
    }

    /// Demote to the smallest exact representation.
    pub fn normalize(self) -> Number {
        match self {
            Number::Big(n) => match n.to_i64() {
                Some(small) => Number::Int(small),
                None => Number::Big(n),
            },
            Number::Ratio(r) if r.is_integer() => Number::Big(r.to_integer()).normalize(),
            other => other,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(n) => *n as f64,
            Number::Big(n) => n.to_f64().unwrap_or(f64::NAN),
            Number::Ratio(r) => {
                let numer = r.numer().to_f64().unwrap_or(f64::NAN);
                let denom = r.denom().to_f64().unwrap_or(f64::NAN);
                numer / denom
            }
            Number::Float(x) => *x,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(n) => *n == 0,
            Number::Big(n) => n.is_zero(),
            Number::Ratio(r) => r.is_zero(),
            Number::Float(x) => *x == 0.0,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Int(_) | Number::Big(_))
    }

    fn integer(&self) -> Option<BigInt> {
        match self {
            Number::Int(n) => Some(BigInt::from(*n)),
            Number::Big(n) => Some(n.clone()),
            _ => None,
        }
    }

    fn exact(&self) -> Option<BigRational> {
        match self {
            Number::Float(_) => None,
            Number::Ratio(r) => Some(r.clone()),
            whole => whole.integer().map(BigRational::from_integer),
        }
    }

    /// Apply an operation at the lowest rank both operands share.
    fn lift(&self, other: &Number, big: BigOp, ratio: RatioOp, float: FloatOp) -> Number {
        if let (Some(a), Some(b)) = (self.integer(), other.integer()) {
            return Number::Big(big(a, b)).normalize();
        }
        if let (Some(a), Some(b)) = (self.exact(), other.exact()) {
            return Number::Ratio(ratio(a, b)).normalize();
        }
        Number::Float(float(self.as_f64(), other.as_f64()))
    }

    // ========================================================================
    // ARITHMETIC
    // ========================================================================

    pub fn add(&self, other: &Number) -> Number {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            if let Some(sum) = a.checked_add(*b) {
                return Number::Int(sum);
            }
        }
        self.lift(other, |a, b| a + b, |a, b| a + b, |a, b| a + b)
    }

    pub fn sub(&self, other: &Number) -> Number {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            if let Some(difference) = a.checked_sub(*b) {
                return Number::Int(difference);
            }
        }
        self.lift(other, |a, b| a - b, |a, b| a - b, |a, b| a - b)
    }

    pub fn mul(&self, other: &Number) -> Number {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            if let Some(product) = a.checked_mul(*b) {
                return Number::Int(product);
            }
        }
        self.lift(other, |a, b| a * b, |a, b| a * b, |a, b| a * b)
    }

    /// Exact division; `None` for a zero divisor.
    pub fn div(&self, other: &Number) -> Option<Number> {
        if other.is_zero() {
            return None;
        }
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            if a.checked_rem(*b) == Some(0) {
                if let Some(quotient) = a.checked_div(*b) {
                    return Some(Number::Int(quotient));
                }
            }
        }
        if let (Some(a), Some(b)) = (self.exact(), other.exact()) {
            return Some(Number::Ratio(a / b).normalize());
        }
        Some(Number::Float(self.as_f64() / other.as_f64()))
    }

    /// Euclidean remainder of two integers; `None` unless both are integers
    /// and the divisor is non-zero.
    pub fn rem_euclid(&self, other: &Number) -> Option<Number> {
        if other.is_zero() {
            return None;
        }
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            if let Some(rem) = a.checked_rem_euclid(*b) {
                return Some(Number::Int(rem));
            }
        }
        let (a, b) = (self.integer()?, other.integer()?);
        let rem = &a % &b;
        let rem = if rem.is_negative() { rem + b.abs() } else { rem };
        Some(Number::Big(rem).normalize())
    }

    pub fn negate(&self) -> Number {
        Number::Int(0).sub(self)
    }

    // ========================================================================
    // COMPARISON
    // ========================================================================

    /// Numeric ordering across representations; `None` only involving NaN.
    pub fn compare(&self, other: &Number) -> Option<Ordering> {
        if let (Number::Int(a), Number::Int(b)) = (self, other) {
            return Some(a.cmp(b));
        }
        if let (Some(a), Some(b)) = (self.exact(), other.exact()) {
            return Some(a.cmp(&b));
        }
        self.as_f64().partial_cmp(&other.as_f64())
    }

    pub fn num_eq(&self, other: &Number) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }
}

// ============================================================================
// LITERALS
// ============================================================================

/// Parse an exact integer or `numer/denom` ratio literal. `None` when the
/// text is neither, or the denominator is zero.
pub fn parse_exact(text: &str) -> Option<Number> {
    if let Ok(n) = text.parse::<i64>() {
        return Some(Number::Int(n));
    }
    let is_digits = |part: &str| {
        let digits = part.strip_prefix('-').unwrap_or(part);
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    };
    match text.split_once('/') {
        Some((numer, denom)) if is_digits(numer) && is_digits(denom) => {
            let numer: BigInt = numer.parse().ok()?;
            let denom: BigInt = denom.parse().ok()?;
            if denom.is_zero() {
                return None;
            }
            Some(Number::Ratio(BigRational::new(numer, denom)).normalize())
        }
        None if is_digits(text) => text.parse::<BigInt>().ok().map(Number::Big),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(numer: i64, denom: i64) -> Number {
        Number::Ratio(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    #[test]
    fn overflow_promotes_and_results_demote() {
        let big = Number::Int(i64::MAX).add(&Number::Int(1));
        assert!(matches!(big, Number::Big(_)));
        assert_eq!(big.sub(&Number::Int(1)), Number::Int(i64::MAX));
        assert_eq!(big.into_value().to_string(), "9223372036854775808");
    }

    #[test]
    fn inexact_integer_division_is_a_ratio() {
        assert_eq!(Number::Int(6).div(&Number::Int(3)), Some(Number::Int(2)));
        assert_eq!(Number::Int(7).div(&Number::Int(2)), Some(ratio(7, 2)));
        assert_eq!(ratio(1, 2).add(&ratio(1, 2)), Number::Int(1));
        assert_eq!(Number::Int(1).div(&Number::Int(0)), None);
    }

    #[test]
    fn floats_are_contagious() {
        assert_eq!(ratio(1, 2).add(&Number::Float(0.5)), Number::Float(1.0));
    }

    #[test]
    fn comparisons_cross_representations() {
        assert!(ratio(1, 2).num_eq(&Number::Float(0.5)));
        assert_eq!(ratio(1, 3).compare(&ratio(1, 2)), Some(Ordering::Less));
        let huge = parse_exact("99999999999999999999").unwrap();
        assert_eq!(huge.compare(&Number::Int(i64::MAX)), Some(Ordering::Greater));
    }

    #[test]
    fn euclidean_remainder_on_big_integers() {
        let huge = parse_exact("-100000000000000000000").unwrap();
        assert_eq!(huge.rem_euclid(&Number::Int(7)), Some(Number::Int(5)));
        assert_eq!(ratio(1, 2).rem_euclid(&Number::Int(2)), None);
    }

    #[test]
    fn parses_exact_literals() {
        assert_eq!(parse_exact("42"), Some(Number::Int(42)));
        assert_eq!(parse_exact("4/2"), Some(Number::Int(2)));
        assert_eq!(parse_exact("-1/2"), Some(ratio(-1, 2)));
        assert_eq!(parse_exact("1/0"), None);
        assert_eq!(parse_exact("12abc"), None);
        assert_eq!(parse_exact("1.5"), None);
    }
}
