use core::fmt::{self, Write as _};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use ecow::{EcoString, EcoVec};
use hashbrown::HashSet;

use super::Function;
use crate::types::{FieldPath, Kind, StructType, Type};

/// A dynamically typed runtime value.
///
/// Cloning is cheap: strings and arrays are reference counted with
/// copy-on-write, maps and structs sit behind an `Arc`.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    /// Platform integer, the width integer literals and arithmetic use.
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint(u64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    String(EcoString),
    Array(EcoVec<Value>),
    /// String-keyed map; iteration follows key order, which callers must
    /// not rely on.
    Map(Arc<BTreeMap<EcoString, Value>>),
    Struct(Arc<StructValue>),
    Time(DateTime<FixedOffset>),
    Duration(Duration),
    Func(Function),
    /// Membership set built from a literal array.
    Set(Arc<ConstSet>),
    Pointer(Arc<Value>),
    Opaque(Arc<dyn Any + Send + Sync>),
}

/// Instance of a host [`StructType`]. Fields are stored positionally in
/// declaration order; embedded structs occupy one slot holding a
/// `Value::Struct`.
#[derive(Debug, Clone)]
pub struct StructValue {
    pub ty: Arc<StructType>,
    pub fields: Vec<Value>,
}

impl StructValue {
    pub fn new(ty: Arc<StructType>, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    /// Follows a resolved field path through embedded structs and pointers.
    pub fn field_at(&self, path: &[u16]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.fields.get(*first as usize)?;
        if rest.is_empty() {
            return Some(value);
        }
        match value.deref_all() {
            Value::Struct(inner) => inner.field_at(rest),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        let (path, _) = self.ty.resolve_field(name)?;
        self.field_at(&path)
    }

    pub fn resolve(&self, name: &str) -> Option<(FieldPath, Type)> {
        self.ty.resolve_field(name)
    }
}

impl PartialEq for StructValue {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.fields == other.fields
    }
}

/// Hashed membership set for `in` against constant arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstSet {
    pub ints: HashSet<i64>,
    pub strings: HashSet<EcoString>,
}

impl ConstSet {
    pub fn len(&self) -> usize {
        self.ints.len() + self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Value {
    pub fn string(s: impl Into<EcoString>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().collect())
    }

    pub fn map<K: Into<EcoString>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(Arc::new(
            pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_)
            | Value::Int8(_)
            | Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Uint(_)
            | Value::Uint8(_)
            | Value::Uint16(_)
            | Value::Uint32(_)
            | Value::Uint64(_) => Kind::Int,
            Value::Float32(_) | Value::Float64(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Array(_) | Value::Set(_) => Kind::Array,
            Value::Map(_) => Kind::Map,
            Value::Struct(_) => Kind::Struct,
            Value::Time(_) => Kind::Time,
            Value::Duration(_) => Kind::Duration,
            Value::Func(_) => Kind::Func,
            Value::Pointer(_) => Kind::Pointer,
            Value::Opaque(_) => Kind::Unknown,
        }
    }

    /// Name used in error messages and by the `type` builtin.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint(_) => "uint",
            Value::Uint8(_) => "uint8",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float",
            Value::Struct(s) => s.ty.name.as_str(),
            Value::Opaque(_) => "opaque",
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::String(_) => "string",
            Value::Array(_) | Value::Set(_) => "array",
            Value::Map(_) => "map",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Func(_) => "func",
            Value::Pointer(_) => "pointer",
        }
    }

    pub fn is_integer(&self) -> bool {
        self.kind() == Kind::Int
    }

    pub fn is_number(&self) -> bool {
        matches!(self.kind(), Kind::Int | Kind::Float)
    }

    /// Integer of any width as `i64`; `None` for non-integers and for
    /// unsigned values above `i64::MAX`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) | Value::Int64(v) => Some(v),
            Value::Int8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Uint(v) | Value::Uint64(v) => i64::try_from(v).ok(),
            Value::Uint8(v) => Some(v.into()),
            Value::Uint16(v) => Some(v.into()),
            Value::Uint32(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Any number as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            Value::Uint(v) | Value::Uint64(v) => Some(v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&EcoVec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Strips every pointer indirection.
    pub fn deref_all(&self) -> &Value {
        let mut value = self;
        while let Value::Pointer(inner) = value {
            value = inner;
        }
        value
    }

    /// Number of elements of a collection, or characters of a string.
    pub fn len(&self) -> Option<usize> {
        match self.deref_all() {
            Value::String(s) => Some(s.chars().count()),
            Value::Array(items) => Some(items.len()),
            Value::Map(map) => Some(map.len()),
            Value::Set(set) => Some(set.len()),
            _ => None,
        }
    }

    /// Renders the value for string conversion: strings unquoted,
    /// everything else as displayed.
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::String(s) => s.to_string(),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) | (Int64(a), Int64(b)) => a == b,
            (Int8(a), Int8(b)) => a == b,
            (Int16(a), Int16(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Uint(a), Uint(b)) | (Uint64(a), Uint64(b)) => a == b,
            (Uint8(a), Uint8(b)) => a == b,
            (Uint16(a), Uint16(b)) => a == b,
            (Uint32(a), Uint32(b)) => a == b,
            (Float32(a), Float32(b)) => a == b,
            (Float64(a), Float64(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Struct(a), Struct(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Duration(a), Duration(b)) => a == b,
            (Func(a), Func(b)) => a.name == b.name,
            (Set(a), Set(b)) => a == b,
            (Pointer(a), Pointer(b)) => a == b,
            (Opaque(a), Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<EcoString> for Value {
    fn from(s: EcoString) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items.into())
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Func(f)
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(Arc::new(s))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) | Value::Int64(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Uint(v) | Value::Uint64(v) => write!(f, "{}", v),
            Value::Uint8(v) => write!(f, "{}", v),
            Value::Uint16(v) => write!(f, "{}", v),
            Value::Uint32(v) => write!(f, "{}", v),
            Value::Float32(v) => format_float(f, f64::from(*v)),
            Value::Float64(v) => format_float(f, *v),
            Value::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Array(items) => {
                f.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_char(']')
            }
            Value::Map(map) => {
                f.write_char('{')?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "\"{}\": {}", escape_string(key), value)?;
                }
                f.write_char('}')
            }
            Value::Struct(s) => {
                write!(f, "{}{{", s.ty.name)?;
                for (i, (def, value)) in s.ty.fields.iter().zip(&s.fields).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", def.exposed_name(), value)?;
                }
                f.write_char('}')
            }
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Duration(d) => f.write_str(&format_duration(d)),
            Value::Func(func) => write!(f, "func {}", func.name),
            Value::Set(set) => write!(f, "set({})", set.len()),
            Value::Pointer(inner) => write!(f, "{}", inner),
            Value::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

fn format_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "+Inf" } else { "-Inf" })
    } else if value == value.trunc() && value.abs() < 1e21 {
        write!(f, "{:.1}", value)
    } else {
        write!(f, "{}", value)
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Formats a duration the way `1h2m3.5s` reads: hours and minutes only
/// when non-zero, sub-second durations in ms, µs or ns.
pub fn format_duration(d: &Duration) -> String {
    let Some(total) = d.num_nanoseconds() else {
        return format!("{}s", d.num_seconds());
    };
    if total == 0 {
        return "0s".to_string();
    }
    let mut out = String::new();
    if total < 0 {
        out.push('-');
    }
    let n = total.unsigned_abs();
    if n < 1_000_000_000 {
        let (unit, div) = if n < 1_000 {
            ("ns", 1)
        } else if n < 1_000_000 {
            ("µs", 1_000)
        } else {
            ("ms", 1_000_000)
        };
        out.push_str(&decimal(n, div));
        out.push_str(unit);
        return out;
    }
    let hours = n / 3_600_000_000_000;
    let minutes = (n / 60_000_000_000) % 60;
    let seconds = n % 60_000_000_000;
    if hours > 0 {
        let _ = write!(out, "{}h", hours);
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{}m", minutes);
    }
    out.push_str(&decimal(seconds, 1_000_000_000));
    out.push('s');
    out
}

fn decimal(n: u64, div: u64) -> String {
    let whole = n / div;
    let rem = n % div;
    if rem == 0 {
        return whole.to_string();
    }
    let width = div.ilog10() as usize;
    let frac = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
