//! Numeric builtins.

use std::cmp::Ordering;

use super::{CallContext, arg, invalid};
use crate::operators::{ordering, to_float, to_int};
use crate::values::Value;
use crate::vm::RuntimeError;

type Output = Result<Value, RuntimeError>;

// ============================================================================
// Basic Operations
// ============================================================================

/// Absolute value, keeping the integer width or float precision.
pub(super) fn abs(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let value = arg("abs", args, 0)?;
    Ok(match *value {
        Value::Int(v) => Value::Int(v.wrapping_abs()),
        Value::Int8(v) => Value::Int8(v.wrapping_abs()),
        Value::Int16(v) => Value::Int16(v.wrapping_abs()),
        Value::Int32(v) => Value::Int32(v.wrapping_abs()),
        Value::Int64(v) => Value::Int64(v.wrapping_abs()),
        Value::Float32(v) => Value::Float32(v.abs()),
        Value::Float64(v) => Value::Float64(v.abs()),
        Value::Uint(_)
        | Value::Uint8(_)
        | Value::Uint16(_)
        | Value::Uint32(_)
        | Value::Uint64(_) => value.clone(),
        _ => return Err(invalid("abs", value)),
    })
}

// ============================================================================
// Rounding Functions
// ============================================================================

fn rounding(name: &str, args: &[Value], op: fn(f64) -> f64) -> Output {
    let value = arg(name, args, 0)?;
    match *value {
        Value::Float32(v) => Ok(Value::Float32(op(v.into()) as f32)),
        Value::Float64(v) => Ok(Value::Float64(op(v))),
        _ if value.is_integer() => Ok(value.clone()),
        _ => Err(invalid(name, value)),
    }
}

/// Smallest integer value >= x; integers are returned unchanged.
pub(super) fn ceil(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    rounding("ceil", args, f64::ceil)
}

/// Largest integer value <= x.
pub(super) fn floor(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    rounding("floor", args, f64::floor)
}

/// Nearest integer value, halves away from zero.
pub(super) fn round(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    rounding("round", args, f64::round)
}

// ============================================================================
// Conversions
// ============================================================================

pub(super) fn int(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    to_int(arg("int", args, 0)?)
}

pub(super) fn float(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    to_float(arg("float", args, 0)?)
}

// ============================================================================
// Aggregates
// ============================================================================

/// Arguments with array arguments spread one level.
fn numbers<'v>(name: &str, args: &'v [Value]) -> Result<Vec<&'v Value>, RuntimeError> {
    let mut out = Vec::with_capacity(args.len());
    for value in args.iter().map(Value::deref_all) {
        match value {
            Value::Array(items) => {
                for item in items.iter().map(Value::deref_all) {
                    if !item.is_number() {
                        return Err(invalid(name, item));
                    }
                    out.push(item);
                }
            }
            v if v.is_number() => out.push(v),
            other => return Err(invalid(name, other)),
        }
    }
    Ok(out)
}

fn extreme(name: &str, args: &[Value], keep: Ordering) -> Output {
    let mut best: Option<&Value> = None;
    for value in numbers(name, args)? {
        best = match best {
            Some(current) if ordering(value, current, name)? != Some(keep) => Some(current),
            _ => Some(value),
        };
    }
    Ok(best.cloned().unwrap_or(Value::Nil))
}

/// Largest of the arguments; array arguments are spread.
pub(super) fn max(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    extreme("max", args, Ordering::Greater)
}

pub(super) fn min(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    extreme("min", args, Ordering::Less)
}

/// Arithmetic mean as a float.
pub(super) fn mean(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let values = numbers("mean", args)?;
    if values.is_empty() {
        return Err(RuntimeError::mismatch("mean of an empty array"));
    }
    let sum: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
    Ok(Value::Float64(sum / values.len() as f64))
}
