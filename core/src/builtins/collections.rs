//! Array and map builtins.
//!
//! Every builtin producing a new container charges its length to the
//! memory budget.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::EcoString;

use super::{CallContext, arg, array_arg, invalid, string_arg};
use crate::operators::{equal, fetch, ordering};
use crate::values::Value;
use crate::vm::RuntimeError;

type Output = Result<Value, RuntimeError>;

fn collect(ctx: &mut CallContext<'_>, items: Vec<Value>) -> Output {
    ctx.memory.charge(items.len())?;
    Ok(Value::Array(items.into()))
}

fn map_arg<'v>(
    name: &str,
    args: &'v [Value],
) -> Result<&'v BTreeMap<EcoString, Value>, RuntimeError> {
    match arg(name, args, 0)? {
        Value::Map(map) => Ok(map),
        other => Err(invalid(name, other)),
    }
}

// ============================================================================
// General
// ============================================================================

pub(super) fn len(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let value = arg("len", args, 0)?;
    value
        .len()
        .map(|n| Value::Int(n as i64))
        .ok_or_else(|| invalid("len", value))
}

/// Kind name of a value; integer widths collapse to `int` or `uint`.
pub(super) fn type_of(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let value = arg("type", args, 0)?;
    let name = match value {
        Value::Uint(_) | Value::Uint8(_) | Value::Uint16(_) | Value::Uint32(_) | Value::Uint64(_) => {
            "uint".to_string()
        }
        Value::Opaque(_) => "unknown".to_string(),
        other => other.kind().to_string(),
    };
    Ok(Value::string(name))
}

// ============================================================================
// Element access
// ============================================================================

/// First element, or `nil` for an empty array.
pub(super) fn first(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("first", args, 0)?;
    Ok(items.first().cloned().unwrap_or(Value::Nil))
}

pub(super) fn last(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("last", args, 0)?;
    Ok(items.last().cloned().unwrap_or(Value::Nil))
}

/// `from[key]` that yields `nil` instead of failing.
pub(super) fn get(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let from = arg("get", args, 0)?;
    let key = arg("get", args, 1)?;
    Ok(fetch(from, key).unwrap_or(Value::Nil))
}

// ============================================================================
// Maps
// ============================================================================

/// Keys in key order.
pub(super) fn keys(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let map = map_arg("keys", args)?;
    collect(ctx, map.keys().cloned().map(Value::String).collect())
}

/// Values in key order.
pub(super) fn values(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let map = map_arg("values", args)?;
    collect(ctx, map.values().cloned().collect())
}

pub(super) fn to_pairs(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let map = map_arg("toPairs", args)?;
    let pairs = map
        .iter()
        .map(|(k, v)| Value::array([Value::String(k.clone()), v.clone()]))
        .collect();
    collect(ctx, pairs)
}

pub(super) fn from_pairs(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("fromPairs", args, 0)?;
    let mut map = BTreeMap::new();
    for item in items.iter().map(Value::deref_all) {
        match item.as_array().map(|pair| &pair[..]) {
            Some([Value::String(key), value]) => {
                map.insert(key.clone(), value.clone());
            }
            _ => return Err(invalid("fromPairs", item)),
        }
    }
    ctx.memory.charge(map.len())?;
    Ok(Value::Map(Arc::new(map)))
}

// ============================================================================
// Arrays
// ============================================================================

pub(super) fn reverse(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("reverse", args, 0)?;
    collect(ctx, items.iter().rev().cloned().collect())
}

/// Distinct elements in order of first appearance.
pub(super) fn uniq(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("uniq", args, 0)?;
    let mut out: Vec<Value> = Vec::new();
    for item in items.iter() {
        if !out.iter().any(|seen| equal(seen, item)) {
            out.push(item.clone());
        }
    }
    collect(ctx, out)
}

pub(super) fn concat(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let mut out = Vec::new();
    for index in 0..args.len() {
        out.extend(array_arg("concat", args, index)?.iter().cloned());
    }
    collect(ctx, out)
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item.deref_all() {
            Value::Array(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}

/// Nested arrays flattened to any depth.
pub(super) fn flatten(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("flatten", args, 0)?;
    let mut out = Vec::new();
    flatten_into(items, &mut out);
    collect(ctx, out)
}

/// `sort(xs[, "asc" | "desc"])` over mutually comparable elements.
pub(super) fn sort(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("sort", args, 0)?;
    let descending = match args.get(1) {
        None => false,
        Some(_) => match string_arg("sort", args, 1)? {
            "asc" => false,
            "desc" => true,
            other => {
                return Err(RuntimeError::mismatch(format!(
                    "unknown order {:?}, use asc or desc",
                    other
                )));
            }
        },
    };
    let mut out: Vec<Value> = items.iter().cloned().collect();
    sort_values(&mut out, descending)?;
    collect(ctx, out)
}

/// Stable sort with the `<` semantics of the language. Incomparable
/// elements fail the whole sort.
fn sort_values(values: &mut [Value], descending: bool) -> Result<(), RuntimeError> {
    let mut failure = None;
    values.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        match ordering(a.deref_all(), b.deref_all(), "<") {
            Ok(Some(order)) if descending => order.reverse(),
            Ok(Some(order)) => order,
            Ok(None) => Ordering::Equal,
            Err(err) => {
                failure = Some(err);
                Ordering::Equal
            }
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
