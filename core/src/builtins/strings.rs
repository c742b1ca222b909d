//! String builtins.
//!
//! Positions (`indexOf`, `lastIndexOf`) count characters, the same unit
//! string indexing and slicing use.

use ecow::EcoString;

use super::{CallContext, arg, array_arg, int_arg, invalid, string_arg};
use crate::values::Value;
use crate::vm::RuntimeError;

type Output = Result<Value, RuntimeError>;

// ============================================================================
// Conversion
// ============================================================================

/// Renders any value; strings are returned as they are.
pub(super) fn string(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    Ok(Value::String(arg("string", args, 0)?.to_plain_string().into()))
}

// ============================================================================
// Trimming and case
// ============================================================================

pub(super) fn trim(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("trim", args, 0)?;
    let trimmed = match args.get(1) {
        Some(_) => {
            let cutset = string_arg("trim", args, 1)?;
            s.trim_matches(|c: char| cutset.contains(c))
        }
        None => s.trim(),
    };
    Ok(Value::string(trimmed))
}

pub(super) fn trim_prefix(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("trimPrefix", args, 0)?;
    let prefix = match args.get(1) {
        Some(_) => string_arg("trimPrefix", args, 1)?,
        None => " ",
    };
    Ok(Value::string(s.strip_prefix(prefix).unwrap_or(s)))
}

pub(super) fn trim_suffix(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("trimSuffix", args, 0)?;
    let suffix = match args.get(1) {
        Some(_) => string_arg("trimSuffix", args, 1)?,
        None => " ",
    };
    Ok(Value::string(s.strip_suffix(suffix).unwrap_or(s)))
}

pub(super) fn upper(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    Ok(Value::string(string_arg("upper", args, 0)?.to_uppercase()))
}

pub(super) fn lower(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    Ok(Value::string(string_arg("lower", args, 0)?.to_lowercase()))
}

// ============================================================================
// Splitting and joining
// ============================================================================

/// `split(s, sep[, n])`. An empty separator splits into characters; a
/// negative `n` means no limit and `n == 0` yields no parts.
pub(super) fn split(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("split", args, 0)?;
    let sep = string_arg("split", args, 1)?;
    let limit = match args.get(2) {
        Some(_) => int_arg("split", args, 2)?,
        None => -1,
    };
    if limit == 0 {
        return Ok(Value::array([]));
    }
    let parts: Vec<Value> = if sep.is_empty() {
        let chars: Vec<char> = s.chars().collect();
        match usize::try_from(limit) {
            Ok(n) if n < chars.len() => {
                let mut parts: Vec<Value> = chars[..n - 1]
                    .iter()
                    .map(|c| Value::String(EcoString::from(*c)))
                    .collect();
                parts.push(Value::string(chars[n - 1..].iter().collect::<String>()));
                parts
            }
            _ => chars
                .into_iter()
                .map(|c| Value::String(EcoString::from(c)))
                .collect(),
        }
    } else {
        match usize::try_from(limit) {
            Ok(n) => s.splitn(n, sep).map(Value::string).collect(),
            Err(_) => s.split(sep).map(Value::string).collect(),
        }
    };
    ctx.memory.charge(parts.len())?;
    Ok(Value::array(parts))
}

/// `join(xs[, glue])` over an array of strings.
pub(super) fn join(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let items = array_arg("join", args, 0)?;
    let glue = match args.get(1) {
        Some(_) => string_arg("join", args, 1)?,
        None => "",
    };
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(glue);
        }
        match item.deref_all() {
            Value::String(s) => out.push_str(s),
            other => return Err(invalid("join", other)),
        }
    }
    Ok(Value::string(out))
}

/// `replace(s, old, new[, n])`; a negative `n` replaces every match.
pub(super) fn replace(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("replace", args, 0)?;
    let old = string_arg("replace", args, 1)?;
    let new = string_arg("replace", args, 2)?;
    let limit = match args.get(3) {
        Some(_) => int_arg("replace", args, 3)?,
        None => -1,
    };
    let out = match usize::try_from(limit) {
        Ok(n) => s.replacen(old, new, n),
        Err(_) => s.replace(old, new),
    };
    Ok(Value::string(out))
}

/// `repeat(s, n)`; `n` is charged to the memory budget.
pub(super) fn repeat(ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("repeat", args, 0)?;
    let n = int_arg("repeat", args, 1)?;
    let n = usize::try_from(n)
        .map_err(|_| RuntimeError::mismatch(format!("invalid repeat count {}", n)))?;
    ctx.memory.charge(n)?;
    Ok(Value::string(s.repeat(n)))
}

// ============================================================================
// Searching
// ============================================================================

fn char_position(s: &str, byte: Option<usize>) -> Value {
    match byte {
        Some(byte) => Value::Int(s[..byte].chars().count() as i64),
        None => Value::Int(-1),
    }
}

pub(super) fn index_of(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("indexOf", args, 0)?;
    let sub = string_arg("indexOf", args, 1)?;
    Ok(char_position(s, s.find(sub)))
}

pub(super) fn last_index_of(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("lastIndexOf", args, 0)?;
    let sub = string_arg("lastIndexOf", args, 1)?;
    Ok(char_position(s, s.rfind(sub)))
}

pub(super) fn has_prefix(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("hasPrefix", args, 0)?;
    Ok(Value::Bool(s.starts_with(string_arg("hasPrefix", args, 1)?)))
}

pub(super) fn has_suffix(_ctx: &mut CallContext<'_>, args: &[Value]) -> Output {
    let s = string_arg("hasSuffix", args, 0)?;
    Ok(Value::Bool(s.ends_with(string_arg("hasSuffix", args, 1)?)))
}
