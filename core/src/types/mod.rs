//! Host type descriptors.
//!
//! The engine never reflects over host data. Instead hosts describe the
//! shape of their environment with [`Type`] values: primitive kinds,
//! arrays, string-keyed maps, named [`StructType`]s (fields, embedded
//! structs, `expr` tags and methods) and [`FunctionType`] signatures.
//! The checker lifts these into natures; the compiler turns resolved
//! struct members into [`FieldDescriptor`]s and [`MethodDescriptor`]s so
//! the VM reaches them positionally.

mod function;
mod structs;

pub use function::FunctionType;
pub use structs::{
    FieldDef, FieldDescriptor, FieldPath, MethodDef, MethodDescriptor, MethodFn, StructType,
};

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Integer widths preserved for interop with host values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl IntKind {
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::Int | IntKind::Int8 | IntKind::Int16 | IntKind::Int32 | IntKind::Int64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
        }
    }

    /// Whether `value` is representable in this width.
    pub fn fits(self, value: i64) -> bool {
        match self {
            IntKind::Int | IntKind::Int64 => true,
            IntKind::Int8 => i8::try_from(value).is_ok(),
            IntKind::Int16 => i16::try_from(value).is_ok(),
            IntKind::Int32 => i32::try_from(value).is_ok(),
            IntKind::Uint | IntKind::Uint64 => value >= 0,
            IntKind::Uint8 => u8::try_from(value).is_ok(),
            IntKind::Uint16 => u16::try_from(value).is_ok(),
            IntKind::Uint32 => u32::try_from(value).is_ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    Float32,
    Float64,
}

impl FloatKind {
    pub fn name(self) -> &'static str {
        match self {
            FloatKind::Float32 => "float32",
            FloatKind::Float64 => "float64",
        }
    }
}

/// Coarse classification used by the checker and by expected-kind options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Unknown,
    Nil,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
    Struct,
    Func,
    Time,
    Duration,
    Pointer,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Unknown => "unknown",
            Kind::Nil => "nil",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Struct => "struct",
            Kind::Func => "func",
            Kind::Time => "time",
            Kind::Duration => "duration",
            Kind::Pointer => "pointer",
        };
        f.write_str(name)
    }
}

/// Shape of a host value.
#[derive(Debug, Clone)]
pub enum Type {
    /// Statically unknown; satisfies every operand constraint.
    Any,
    Nil,
    Bool,
    Int(IntKind),
    Float(FloatKind),
    String,
    Time,
    Duration,
    Array(Box<Type>),
    /// Map with string keys.
    Map(Box<Type>),
    Struct(Arc<StructType>),
    Func(Arc<FunctionType>),
    Pointer(Box<Type>),
}

impl Type {
    pub const INT: Type = Type::Int(IntKind::Int);
    pub const FLOAT: Type = Type::Float(FloatKind::Float64);

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn map(elem: Type) -> Type {
        Type::Map(Box::new(elem))
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Type {
        Type::Func(Arc::new(FunctionType::new(params, ret)))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Any => Kind::Unknown,
            Type::Nil => Kind::Nil,
            Type::Bool => Kind::Bool,
            Type::Int(_) => Kind::Int,
            Type::Float(_) => Kind::Float,
            Type::String => Kind::String,
            Type::Time => Kind::Time,
            Type::Duration => Kind::Duration,
            Type::Array(_) => Kind::Array,
            Type::Map(_) => Kind::Map,
            Type::Struct(_) => Kind::Struct,
            Type::Func(_) => Kind::Func,
            Type::Pointer(_) => Kind::Pointer,
        }
    }

    /// Element type of arrays, maps and pointers; `Any` otherwise.
    pub fn elem(&self) -> Type {
        match self {
            Type::Array(elem) | Type::Map(elem) | Type::Pointer(elem) => (**elem).clone(),
            _ => Type::Any,
        }
    }

    /// Strips pointer indirections.
    pub fn deref(&self) -> &Type {
        let mut ty = self;
        while let Type::Pointer(elem) = ty {
            ty = elem;
        }
        ty
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Type::Int(_) | Type::Float(_))
    }

    /// Assignability of a value of `self` to a slot of `target`.
    pub fn assignable_to(&self, target: &Type) -> bool {
        match (self, target) {
            (_, Type::Any) | (Type::Any, _) => true,
            (Type::Nil, Type::Pointer(_) | Type::Array(_) | Type::Map(_) | Type::Func(_)) => true,
            (Type::Array(a), Type::Array(b)) | (Type::Map(a), Type::Map(b)) => {
                b.is_any() || a == b
            }
            _ => self == target,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Any, Type::Any)
            | (Type::Nil, Type::Nil)
            | (Type::Bool, Type::Bool)
            | (Type::String, Type::String)
            | (Type::Time, Type::Time)
            | (Type::Duration, Type::Duration) => true,
            (Type::Int(a), Type::Int(b)) => a == b,
            (Type::Float(a), Type::Float(b)) => a == b,
            (Type::Array(a), Type::Array(b))
            | (Type::Map(a), Type::Map(b))
            | (Type::Pointer(a), Type::Pointer(b)) => a == b,
            (Type::Struct(a), Type::Struct(b)) => Arc::ptr_eq(a, b) || a.name == b.name,
            (Type::Func(a), Type::Func(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Nil => f.write_str("nil"),
            Type::Bool => f.write_str("bool"),
            Type::Int(kind) => f.write_str(kind.name()),
            Type::Float(kind) => f.write_str(kind.name()),
            Type::String => f.write_str("string"),
            Type::Time => f.write_str("time"),
            Type::Duration => f.write_str("duration"),
            Type::Array(elem) => write!(f, "[]{}", elem),
            Type::Map(elem) => write!(f, "map[string]{}", elem),
            Type::Struct(st) => f.write_str(&st.name),
            Type::Func(func) => write!(f, "{}", func),
            Type::Pointer(elem) => write!(f, "*{}", elem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(Type::array(Type::INT).to_string(), "[]int");
        assert_eq!(Type::map(Type::array(Type::String)).to_string(), "map[string][]string");
        assert_eq!(
            Type::func(vec![Type::INT, Type::String], Type::Bool).to_string(),
            "func(int, string) bool"
        );
    }

    #[test]
    fn test_assignable() {
        assert!(Type::INT.assignable_to(&Type::Any));
        assert!(Type::array(Type::INT).assignable_to(&Type::array(Type::Any)));
        assert!(!Type::INT.assignable_to(&Type::Int(IntKind::Int32)));
        assert!(Type::Nil.assignable_to(&Type::map(Type::INT)));
        assert!(!Type::Nil.assignable_to(&Type::INT));
    }

    #[test]
    fn test_int_kind_fits() {
        assert!(IntKind::Int8.fits(127));
        assert!(!IntKind::Int8.fits(128));
        assert!(!IntKind::Uint.fits(-1));
        assert!(IntKind::Uint16.fits(65535));
    }
}
