use serde::{Deserialize, Serialize};

use super::Number;
use crate::values::Value;
use crate::vm::RuntimeError;

/// Result kinds a program can be forced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum CastTarget {
    Int = 0,
    Int64 = 1,
    Float64 = 2,
}

impl CastTarget {
    pub fn from_u16(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(CastTarget::Int),
            1 => Some(CastTarget::Int64),
            2 => Some(CastTarget::Float64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CastTarget::Int => "int",
            CastTarget::Int64 => "int64",
            CastTarget::Float64 => "float64",
        }
    }
}

pub fn cast(value: &Value, target: CastTarget) -> Result<Value, RuntimeError> {
    let number = Number::of(value.deref_all()).ok_or_else(|| {
        RuntimeError::mismatch(format!(
            "cannot use {} as {}",
            value.type_name(),
            target.name()
        ))
    })?;
    Ok(match (target, number) {
        (CastTarget::Int, Number::Int(v)) => Value::Int(v),
        (CastTarget::Int, Number::Float(v)) => Value::Int(v as i64),
        (CastTarget::Int64, Number::Int(v)) => Value::Int64(v),
        (CastTarget::Int64, Number::Float(v)) => Value::Int64(v as i64),
        (CastTarget::Float64, n) => Value::Float64(n.as_f64()),
    })
}

/// `int(x)`: numbers truncate, strings parse.
pub fn to_int(value: &Value) -> Result<Value, RuntimeError> {
    match value.deref_all() {
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| RuntimeError::mismatch(format!("invalid operation: int({:?})", s.as_str()))),
        other => match Number::of(other) {
            Some(Number::Int(v)) => Ok(Value::Int(v)),
            Some(Number::Float(v)) => Ok(Value::Int(v as i64)),
            None => Err(RuntimeError::mismatch(format!(
                "invalid operation: int({})",
                other.type_name()
            ))),
        },
    }
}

/// `float(x)`: numbers widen, strings parse.
pub fn to_float(value: &Value) -> Result<Value, RuntimeError> {
    match value.deref_all() {
        Value::String(s) => s.trim().parse::<f64>().map(Value::Float64).map_err(|_| {
            RuntimeError::mismatch(format!("invalid operation: float({:?})", s.as_str()))
        }),
        other => Number::of(other)
            .map(|n| Value::Float64(n.as_f64()))
            .ok_or_else(|| {
                RuntimeError::mismatch(format!(
                    "invalid operation: float({})",
                    other.type_name()
                ))
            }),
    }
}

/// Condition value of a jump: only booleans are accepted.
pub fn truthy(value: &Value) -> Result<bool, RuntimeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(RuntimeError::mismatch(format!(
            "non-bool value (type {}) used as condition",
            other.type_name()
        ))),
    }
}
