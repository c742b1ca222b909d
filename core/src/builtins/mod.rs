//! Builtin function library.
//!
//! Two families live in one table:
//! - loop builtins (`all`, `filter`, `map`, `reduce`, ...) take a predicate
//!   and are compiled into VM loops,
//! - call builtins (`len`, `upper`, `max`, ...) are ordinary functions,
//!   called through [`Function`](crate::values::Function) values.
//!
//! Every call builtin declares a checker that validates argument natures
//! and computes the result nature.

mod check;
mod collections;
mod math;
mod strings;
mod time;

use hashbrown::HashMap;
use lazy_static::lazy_static;

use crate::analyzer::Nature;
use crate::api::Timezone;
use crate::values::Value;
use crate::vm::{Memory, RuntimeError};

pub use check::BuiltinCheckError;
pub use time::parse_duration;

/// Runtime services available to call builtins.
pub struct CallContext<'a> {
    pub memory: &'a mut Memory,
    pub timezone: &'a Timezone,
}

pub type BuiltinFn = fn(&mut CallContext<'_>, &[Value]) -> Result<Value, RuntimeError>;

/// Validates argument natures and returns the result nature.
pub type CheckFn = fn(&str, &[Nature]) -> Result<Nature, BuiltinCheckError>;

#[derive(Clone, Copy)]
pub enum BuiltinKind {
    /// Compiled into a loop over its first argument.
    Loop,
    Call(BuiltinFn),
}

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub kind: BuiltinKind,
    pub check: CheckFn,
}

impl Builtin {
    const fn call(name: &'static str, check: CheckFn, func: BuiltinFn) -> Self {
        Self {
            name,
            kind: BuiltinKind::Call(func),
            check,
        }
    }

    const fn looping(name: &'static str) -> Self {
        Self {
            name,
            kind: BuiltinKind::Loop,
            check: check::any_result,
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self.kind, BuiltinKind::Loop)
    }

    pub fn func(&self) -> Option<BuiltinFn> {
        match self.kind {
            BuiltinKind::Call(func) => Some(func),
            BuiltinKind::Loop => None,
        }
    }
}

impl core::fmt::Debug for Builtin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("loop", &self.is_loop())
            .finish()
    }
}

lazy_static! {
    /// Every builtin, indexed by its position; the index is what `LoadFunc`
    /// carries, so entries are only ever appended.
    pub static ref BUILTINS: Vec<Builtin> = vec![
        Builtin::looping("all"),
        Builtin::looping("none"),
        Builtin::looping("any"),
        Builtin::looping("one"),
        Builtin::looping("filter"),
        Builtin::looping("map"),
        Builtin::looping("count"),
        Builtin::looping("sum"),
        Builtin::looping("find"),
        Builtin::looping("findIndex"),
        Builtin::looping("findLast"),
        Builtin::looping("findLastIndex"),
        Builtin::looping("groupBy"),
        Builtin::looping("sortBy"),
        Builtin::looping("reduce"),
        Builtin::call("len", check::len, collections::len),
        Builtin::call("type", check::type_of, collections::type_of),
        Builtin::call("abs", check::number_same, math::abs),
        Builtin::call("ceil", check::number_same, math::ceil),
        Builtin::call("floor", check::number_same, math::floor),
        Builtin::call("round", check::number_same, math::round),
        Builtin::call("int", check::to_int, math::int),
        Builtin::call("float", check::to_float, math::float),
        Builtin::call("string", check::to_string, strings::string),
        Builtin::call("trim", check::trim, strings::trim),
        Builtin::call("trimPrefix", check::string_string, strings::trim_prefix),
        Builtin::call("trimSuffix", check::string_string, strings::trim_suffix),
        Builtin::call("upper", check::string_unary, strings::upper),
        Builtin::call("lower", check::string_unary, strings::lower),
        Builtin::call("split", check::split, strings::split),
        Builtin::call("replace", check::replace, strings::replace),
        Builtin::call("repeat", check::repeat, strings::repeat),
        Builtin::call("join", check::join, strings::join),
        Builtin::call("indexOf", check::string_index, strings::index_of),
        Builtin::call("lastIndexOf", check::string_index, strings::last_index_of),
        Builtin::call("hasPrefix", check::string_predicate, strings::has_prefix),
        Builtin::call("hasSuffix", check::string_predicate, strings::has_suffix),
        Builtin::call("max", check::min_max, math::max),
        Builtin::call("min", check::min_max, math::min),
        Builtin::call("mean", check::mean, math::mean),
        Builtin::call("first", check::element, collections::first),
        Builtin::call("last", check::element, collections::last),
        Builtin::call("get", check::get, collections::get),
        Builtin::call("keys", check::keys, collections::keys),
        Builtin::call("values", check::values, collections::values),
        Builtin::call("reverse", check::same_array, collections::reverse),
        Builtin::call("uniq", check::same_array, collections::uniq),
        Builtin::call("concat", check::concat, collections::concat),
        Builtin::call("flatten", check::flatten, collections::flatten),
        Builtin::call("sort", check::sort, collections::sort),
        Builtin::call("toPairs", check::to_pairs, collections::to_pairs),
        Builtin::call("fromPairs", check::from_pairs, collections::from_pairs),
        Builtin::call("now", check::now, time::now),
        Builtin::call("duration", check::duration, time::duration),
        Builtin::call("date", check::date, time::date),
    ];

    static ref INDEX: HashMap<&'static str, u16> = BUILTINS
        .iter()
        .enumerate()
        .map(|(i, b)| (b.name, i as u16))
        .collect();
}

/// Index and entry of the builtin called `name`.
pub fn lookup(name: &str) -> Option<(u16, &'static Builtin)> {
    let index = *INDEX.get(name)?;
    Some((index, &BUILTINS[index as usize]))
}

pub fn get(index: u16) -> Option<&'static Builtin> {
    BUILTINS.get(index as usize)
}

pub fn is_loop(name: &str) -> bool {
    lookup(name).is_some_and(|(_, b)| b.is_loop())
}

// ============================================================================
// Argument access
// ============================================================================

fn invalid(name: &str, value: &Value) -> RuntimeError {
    RuntimeError::mismatch(format!(
        "invalid argument for {} (type {})",
        name,
        value.type_name()
    ))
}

fn arg<'v>(name: &str, args: &'v [Value], index: usize) -> Result<&'v Value, RuntimeError> {
    args.get(index)
        .map(Value::deref_all)
        .ok_or_else(|| RuntimeError::Arity {
            name: name.to_string(),
            too_many: false,
        })
}

fn string_arg<'v>(name: &str, args: &'v [Value], index: usize) -> Result<&'v str, RuntimeError> {
    match arg(name, args, index)? {
        Value::String(s) => Ok(s.as_str()),
        other => Err(invalid(name, other)),
    }
}

fn int_arg(name: &str, args: &[Value], index: usize) -> Result<i64, RuntimeError> {
    let value = arg(name, args, index)?;
    value.as_i64().ok_or_else(|| invalid(name, value))
}

fn array_arg<'v>(
    name: &str,
    args: &'v [Value],
    index: usize,
) -> Result<&'v ecow::EcoVec<Value>, RuntimeError> {
    match arg(name, args, index)? {
        Value::Array(items) => Ok(items),
        other => Err(invalid(name, other)),
    }
}

#[cfg(test)]
mod builtins_test;
