use ecow::{EcoString, EcoVec};
use regex::Regex;

use super::{compare::equal, mismatch};
use crate::values::{Function, Value};
use crate::vm::RuntimeError;

/// Position `index` counted from the end when negative.
fn normalize(index: i64, len: usize) -> Option<usize> {
    let index = if index < 0 {
        index.checked_add(len as i64)?
    } else {
        index
    };
    usize::try_from(index).ok().filter(|i| *i < len)
}

fn integer_index(key: &Value) -> Result<i64, RuntimeError> {
    key.as_i64().ok_or_else(|| RuntimeError::NonIntegerIndex {
        ty: key.type_name().to_string(),
    })
}

/// `from[key]`: arrays and strings by (possibly negative) integer, maps by
/// string key, structs by field or method name.
pub fn fetch(from: &Value, key: &Value) -> Result<Value, RuntimeError> {
    match from.deref_all() {
        Value::Array(items) => {
            let index = integer_index(key)?;
            normalize(index, items.len())
                .map(|i| items[i].clone())
                .ok_or(RuntimeError::IndexOutOfRange {
                    index,
                    len: items.len(),
                })
        }
        Value::String(s) => {
            let index = integer_index(key)?;
            let len = s.chars().count();
            normalize(index, len)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.into()))
                .ok_or(RuntimeError::IndexOutOfRange { index, len })
        }
        Value::Map(_) | Value::Struct(_) | Value::Nil => match key {
            Value::String(name) => fetch_member(from, name),
            _ => Err(RuntimeError::mismatch(format!(
                "cannot use {} as key to {}",
                key.type_name(),
                from.type_name()
            ))),
        },
        other => Err(RuntimeError::UnknownDynamicField {
            name: key.to_plain_string(),
            ty: other.type_name().to_string(),
        }),
    }
}

/// `from.name` resolved by name at run time. Missing map keys are `nil`;
/// a missing struct member is an error.
pub fn fetch_member(from: &Value, name: &str) -> Result<Value, RuntimeError> {
    match from.deref_all() {
        Value::Map(map) => Ok(map.get(name).cloned().unwrap_or(Value::Nil)),
        Value::Struct(s) => {
            if let Some(value) = s.field(name) {
                return Ok(value.clone());
            }
            if let Some((index, _)) = s.ty.method_index(name) {
                return bind_method(from, index, name);
            }
            Err(RuntimeError::UnknownDynamicField {
                name: name.to_string(),
                ty: s.ty.name.to_string(),
            })
        }
        other => Err(RuntimeError::UnknownDynamicField {
            name: name.to_string(),
            ty: other.type_name().to_string(),
        }),
    }
}

/// Field at a path resolved by the checker.
pub fn fetch_field(from: &Value, path: &[u16], name: &str) -> Result<Value, RuntimeError> {
    match from.deref_all() {
        Value::Struct(s) => s
            .field_at(path)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownDynamicField {
                name: name.to_string(),
                ty: s.ty.name.to_string(),
            }),
        // Maps checked like structs still answer by name.
        Value::Map(_) => fetch_member(from, name),
        other => Err(RuntimeError::UnknownDynamicField {
            name: name.to_string(),
            ty: other.type_name().to_string(),
        }),
    }
}

/// Method slot `index` of a struct receiver as a callable value.
pub fn bind_method(receiver: &Value, index: u16, name: &str) -> Result<Value, RuntimeError> {
    match receiver.deref_all() {
        Value::Struct(s) => {
            let def = s.ty.methods.get(index as usize).ok_or_else(|| {
                RuntimeError::UnknownDynamicField {
                    name: name.to_string(),
                    ty: s.ty.name.to_string(),
                }
            })?;
            Ok(Value::Func(Function::bound(
                def.name.clone(),
                receiver.deref_all().clone(),
                def.imp.clone(),
            )))
        }
        other => Err(RuntimeError::UnknownDynamicField {
            name: name.to_string(),
            ty: other.type_name().to_string(),
        }),
    }
}

fn bound(value: Option<&Value>, default: i64, len: usize) -> Result<usize, RuntimeError> {
    let index = match value {
        None | Some(Value::Nil) => default,
        Some(v) => integer_index(v)?,
    };
    let index = if index < 0 {
        index.saturating_add(len as i64)
    } else {
        index
    };
    Ok(index.clamp(0, len as i64) as usize)
}

/// `array[from:to]` with bounds clamped into `[0, len]`.
pub fn slice(
    array: &Value,
    from: Option<&Value>,
    to: Option<&Value>,
) -> Result<Value, RuntimeError> {
    match array.deref_all() {
        Value::Array(items) => {
            let len = items.len();
            let (from, to) = (bound(from, 0, len)?, bound(to, len as i64, len)?);
            if from >= to {
                return Ok(Value::Array(EcoVec::new()));
            }
            Ok(Value::Array(items[from..to].iter().cloned().collect()))
        }
        Value::String(s) => {
            let len = s.chars().count();
            let (from, to) = (bound(from, 0, len)?, bound(to, len as i64, len)?);
            if from >= to {
                return Ok(Value::String(EcoString::new()));
            }
            Ok(Value::String(s.chars().skip(from).take(to - from).collect()))
        }
        other => Err(RuntimeError::mismatch(format!(
            "cannot slice {}",
            other.type_name()
        ))),
    }
}

/// `needle in haystack`.
pub fn is_in(needle: &Value, haystack: &Value) -> Result<bool, RuntimeError> {
    match haystack.deref_all() {
        Value::Array(items) => Ok(items.iter().any(|item| equal(needle, item))),
        Value::Set(set) => Ok(match needle {
            Value::String(s) => set.strings.contains(s),
            other => other.as_i64().is_some_and(|v| set.ints.contains(&v)),
        }),
        Value::Map(map) => match needle {
            Value::String(key) => Ok(map.contains_key(key)),
            Value::Nil => Ok(false),
            _ => Err(mismatch("in", needle, haystack)),
        },
        Value::Struct(s) => match needle {
            Value::String(name) => Ok(s.ty.resolve_field(name).is_some()),
            _ => Err(mismatch("in", needle, haystack)),
        },
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            _ => Err(mismatch("in", needle, haystack)),
        },
        Value::Nil => Ok(false),
        _ => Err(mismatch("in", needle, haystack)),
    }
}

fn strings<'a>(op: &str, a: &'a Value, b: &'a Value) -> Result<(&'a str, &'a str), RuntimeError> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok((x, y)),
        _ => Err(mismatch(op, a, b)),
    }
}

pub fn contains(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    let (a, b) = strings("contains", a, b)?;
    Ok(a.contains(b))
}

pub fn starts_with(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    let (a, b) = strings("startsWith", a, b)?;
    Ok(a.starts_with(b))
}

pub fn ends_with(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    let (a, b) = strings("endsWith", a, b)?;
    Ok(a.ends_with(b))
}

/// `text matches pattern` with a pattern only known at run time.
pub fn matches(text: &Value, pattern: &Value) -> Result<bool, RuntimeError> {
    let (text, pattern) = strings("matches", text, pattern)?;
    let regex = Regex::new(pattern).map_err(|e| RuntimeError::BadRegex(e.to_string()))?;
    Ok(regex.is_match(text))
}
