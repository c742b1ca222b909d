use std::cmp::Ordering;

use super::{Number, mismatch};
use crate::values::Value;
use crate::vm::RuntimeError;

/// Ordering of two comparable values; `None` when a float operand is NaN.
pub fn ordering(a: &Value, b: &Value, op: &str) -> Result<Option<Ordering>, RuntimeError> {
    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        return Ok(match (x, y) {
            (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
            _ => x.as_f64().partial_cmp(&y.as_f64()),
        });
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Some(x.as_bytes().cmp(y.as_bytes()))),
        (Value::Time(x), Value::Time(y)) => Ok(Some(x.cmp(y))),
        (Value::Duration(x), Value::Duration(y)) => Ok(Some(x.cmp(y))),
        _ => Err(mismatch(op, a, b)),
    }
}

pub fn less(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    Ok(ordering(a, b, "<")? == Some(Ordering::Less))
}

pub fn more(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    Ok(ordering(a, b, ">")? == Some(Ordering::Greater))
}

pub fn less_or_equal(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    Ok(matches!(
        ordering(a, b, "<=")?,
        Some(Ordering::Less | Ordering::Equal)
    ))
}

pub fn more_or_equal(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    Ok(matches!(
        ordering(a, b, ">=")?,
        Some(Ordering::Greater | Ordering::Equal)
    ))
}

/// Structural equality after numeric promotion. Never fails: values of
/// unrelated kinds are simply unequal.
pub fn equal(a: &Value, b: &Value) -> bool {
    let (a, b) = (a.deref_all(), b.deref_all());
    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        return match (x, y) {
            (Number::Int(x), Number::Int(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        };
    }
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Nil, _) | (_, Value::Nil) => false,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(x, y)| equal(x, y))
        }
        (Value::Map(x), Value::Map(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|((kx, vx), (ky, vy))| kx == ky && equal(vx, vy))
        }
        (Value::Func(x), Value::Func(y)) => x.name == y.name,
        (Value::Opaque(x), Value::Opaque(y)) => std::sync::Arc::ptr_eq(x, y),
        _ => a == b,
    }
}
