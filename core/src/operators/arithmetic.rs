use chrono::Duration;
use ecow::{EcoString, EcoVec};

use super::{Number, mismatch};
use crate::vm::{Memory, RuntimeError};
use crate::values::Value;

fn nanos(d: &Duration) -> Result<i64, RuntimeError> {
    d.num_nanoseconds()
        .ok_or_else(|| RuntimeError::mismatch("duration overflow"))
}

fn duration_of_nanos(n: f64) -> Result<Value, RuntimeError> {
    if !n.is_finite() || n.abs() >= i64::MAX as f64 {
        return Err(RuntimeError::mismatch("duration overflow"));
    }
    Ok(Value::Duration(Duration::nanoseconds(n as i64)))
}

fn concat(a: &str, b: &str) -> Value {
    let mut s = EcoString::with_capacity(a.len() + b.len());
    s.push_str(a);
    s.push_str(b);
    Value::String(s)
}

pub fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        return Ok(match (x, y) {
            (Number::Int(x), Number::Int(y)) => Value::Int(x.wrapping_add(y)),
            _ => Value::Float64(x.as_f64() + y.as_f64()),
        });
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(concat(x, y)),
        (Value::String(x), y) if y.is_number() => Ok(concat(x, &y.to_string())),
        (x, Value::String(y)) if x.is_number() => Ok(concat(&x.to_string(), y)),
        (Value::Time(t), Value::Duration(d)) | (Value::Duration(d), Value::Time(t)) => t
            .checked_add_signed(*d)
            .map(Value::Time)
            .ok_or_else(|| RuntimeError::mismatch("time overflow")),
        (Value::Duration(x), Value::Duration(y)) => x
            .checked_add(y)
            .map(Value::Duration)
            .ok_or_else(|| RuntimeError::mismatch("duration overflow")),
        _ => Err(mismatch("+", a, b)),
    }
}

pub fn subtract(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        return Ok(match (x, y) {
            (Number::Int(x), Number::Int(y)) => Value::Int(x.wrapping_sub(y)),
            _ => Value::Float64(x.as_f64() - y.as_f64()),
        });
    }
    match (a, b) {
        (Value::Time(x), Value::Time(y)) => Ok(Value::Duration(x.signed_duration_since(*y))),
        (Value::Time(t), Value::Duration(d)) => t
            .checked_sub_signed(*d)
            .map(Value::Time)
            .ok_or_else(|| RuntimeError::mismatch("time overflow")),
        (Value::Duration(x), Value::Duration(y)) => x
            .checked_sub(y)
            .map(Value::Duration)
            .ok_or_else(|| RuntimeError::mismatch("duration overflow")),
        _ => Err(mismatch("-", a, b)),
    }
}

pub fn multiply(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        return Ok(match (x, y) {
            (Number::Int(x), Number::Int(y)) => Value::Int(x.wrapping_mul(y)),
            _ => Value::Float64(x.as_f64() * y.as_f64()),
        });
    }
    match (a, b) {
        (Value::Duration(d), n) | (n, Value::Duration(d)) if n.is_number() => {
            match Number::of(n) {
                Some(Number::Int(k)) => nanos(d)?
                    .checked_mul(k)
                    .map(|n| Value::Duration(Duration::nanoseconds(n)))
                    .ok_or_else(|| RuntimeError::mismatch("duration overflow")),
                Some(Number::Float(k)) => duration_of_nanos(nanos(d)? as f64 * k),
                None => Err(mismatch("*", a, b)),
            }
        }
        _ => Err(mismatch("*", a, b)),
    }
}

pub fn divide(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    if let (Some(x), Some(y)) = (Number::of(a), Number::of(b)) {
        if let Number::Int(0) = y
            && let Number::Int(_) = x
        {
            return Err(RuntimeError::DivideByZero);
        }
        return Ok(Value::Float64(x.as_f64() / y.as_f64()));
    }
    match (a, b) {
        (Value::Duration(x), Value::Duration(y)) => {
            let y = nanos(y)?;
            if y == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            Ok(Value::Float64(nanos(x)? as f64 / y as f64))
        }
        (Value::Duration(d), n) if n.is_number() => match Number::of(n) {
            Some(Number::Int(0)) => Err(RuntimeError::DivideByZero),
            Some(Number::Int(k)) => Ok(Value::Duration(Duration::nanoseconds(
                nanos(d)?.wrapping_div(k),
            ))),
            Some(Number::Float(k)) => duration_of_nanos(nanos(d)? as f64 / k),
            None => Err(mismatch("/", a, b)),
        },
        _ => Err(mismatch("/", a, b)),
    }
}

pub fn modulo(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (Number::of(a), Number::of(b)) {
        (Some(Number::Int(_)), Some(Number::Int(0))) => Err(RuntimeError::DivideByZero),
        (Some(Number::Int(x)), Some(Number::Int(y))) => Ok(Value::Int(x.wrapping_rem(y))),
        _ => Err(mismatch("%", a, b)),
    }
}

pub fn exponent(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (Number::of(a), Number::of(b)) {
        (Some(x), Some(y)) => Ok(Value::Float64(x.as_f64().powf(y.as_f64()))),
        _ => Err(mismatch("**", a, b)),
    }
}

pub fn negate(a: &Value) -> Result<Value, RuntimeError> {
    match (Number::of(a), a) {
        (Some(Number::Int(v)), _) => Ok(Value::Int(v.wrapping_neg())),
        (Some(Number::Float(v)), _) => Ok(Value::Float64(-v)),
        (None, Value::Duration(d)) => Ok(Value::Duration(-*d)),
        _ => Err(RuntimeError::mismatch(format!(
            "invalid operation: -{}",
            a.type_name()
        ))),
    }
}

/// Unary `+`: numbers pass through unchanged.
pub fn plus(a: &Value) -> Result<Value, RuntimeError> {
    if a.is_number() || matches!(a, Value::Duration(_)) {
        return Ok(a.clone());
    }
    Err(RuntimeError::mismatch(format!(
        "invalid operation: +{}",
        a.type_name()
    )))
}

/// Inclusive integer range `from..to`, charged to `memory`. An empty
/// array when `to < from`.
pub fn range(from: &Value, to: &Value, memory: &mut Memory) -> Result<Value, RuntimeError> {
    let (Some(Number::Int(from)), Some(Number::Int(to))) = (Number::of(from), Number::of(to))
    else {
        return Err(mismatch("..", from, to));
    };
    if to < from {
        return Ok(Value::Array(EcoVec::new()));
    }
    let len = (to as i128 - from as i128 + 1).min(usize::MAX as i128) as usize;
    memory.charge(len)?;
    let mut items = EcoVec::with_capacity(len);
    for v in from..=to {
        items.push(Value::Int(v));
    }
    Ok(Value::Array(items))
}
