//! Runtime semantics of the expression operators.
//!
//! Shared by the VM, the builtin library and the optimizer's constant
//! folding, so every path agrees on the numeric lattice:
//!
//! - every integer width widens to `i64`, wrapping on overflow; `u64`
//!   values above `i64::MAX` widen to `f64` instead,
//! - an integer meeting a float becomes a float,
//! - `/` always yields a float, `%` needs two integers,
//! - integer `/` and `%` by zero fail with `integer divide by zero`.

mod access;
mod arithmetic;
mod compare;
mod convert;

pub use access::{
    bind_method, contains, ends_with, fetch, fetch_field, fetch_member, is_in, matches, slice,
    starts_with,
};
pub use arithmetic::{add, divide, exponent, modulo, multiply, negate, plus, range, subtract};
pub use compare::{equal, less, less_or_equal, more, more_or_equal, ordering};
pub use convert::{CastTarget, cast, to_float, to_int, truthy};

use crate::values::Value;

/// A value widened onto the numeric lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub(crate) fn of(value: &Value) -> Option<Number> {
        match value {
            Value::Float32(v) => Some(Number::Float((*v).into())),
            Value::Float64(v) => Some(Number::Float(*v)),
            Value::Uint(v) | Value::Uint64(v) if i64::try_from(*v).is_err() => {
                Some(Number::Float(*v as f64))
            }
            other => other.as_i64().map(Number::Int),
        }
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

/// The message of a binary operator rejecting its operands.
pub(crate) fn mismatch(op: &str, a: &Value, b: &Value) -> crate::vm::RuntimeError {
    let (a, b) = (a.type_name(), b.type_name());
    crate::vm::RuntimeError::mismatch(if a == b {
        format!("invalid operation: {} {} {}", a, op, b)
    } else {
        format!(
            "invalid operation: {} {} {} (mismatched types {} and {})",
            a, op, b, a, b
        )
    })
}

#[cfg(test)]
mod operators_test;
