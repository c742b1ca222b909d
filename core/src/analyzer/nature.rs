//! The checker's view of a value: a [`Type`] plus what the checker learned
//! about it (nil-ness, known map keys, callable signatures).

use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::EcoString;

use crate::types::{FloatKind, FunctionType, IntKind, Kind, Type};
use crate::values::Value;

/// Signature information of something callable.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncInfo {
    pub name: EcoString,
    /// Declared overloads; empty means anything goes.
    pub types: Vec<FunctionType>,
    /// Typed dispatch slot for zero-argument functions.
    pub typed: Option<u16>,
}

/// Checked type of an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Nature {
    pub ty: Type,
    /// The literal `nil`.
    pub nil: bool,
    /// Undeclared members are errors.
    pub strict: bool,
    /// Known keys of a map or fields of an environment.
    pub fields: Option<Arc<BTreeMap<EcoString, Nature>>>,
    pub func: Option<Arc<FuncInfo>>,
    /// Method slot when this is a method of a struct receiver.
    pub method: Option<u16>,
}

impl Default for Nature {
    fn default() -> Self {
        Self::unknown()
    }
}

impl Nature {
    pub fn unknown() -> Self {
        Self::of(Type::Any)
    }

    pub fn of(ty: Type) -> Self {
        Self {
            ty,
            nil: false,
            strict: false,
            fields: None,
            func: None,
            method: None,
        }
    }

    pub fn nil() -> Self {
        Self {
            nil: true,
            ..Self::of(Type::Nil)
        }
    }

    pub fn bool() -> Self {
        Self::of(Type::Bool)
    }

    pub fn int() -> Self {
        Self::of(Type::INT)
    }

    pub fn float() -> Self {
        Self::of(Type::FLOAT)
    }

    pub fn string() -> Self {
        Self::of(Type::String)
    }

    pub fn array_of(elem: Type) -> Self {
        Self::of(Type::array(elem))
    }

    pub fn function(info: FuncInfo) -> Self {
        let ty = match info.types.as_slice() {
            [single] => Type::Func(Arc::new(single.clone())),
            _ => Type::Any,
        };
        Self {
            func: Some(Arc::new(info)),
            ..Self::of(ty)
        }
    }

    /// Nature of a concrete host value. Map values remember their keys so
    /// member access on them can be typed.
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Nil => Self::nil(),
            Value::Bool(_) => Self::bool(),
            Value::Int(_) => Self::int(),
            Value::Int8(_) => Self::of(Type::Int(IntKind::Int8)),
            Value::Int16(_) => Self::of(Type::Int(IntKind::Int16)),
            Value::Int32(_) => Self::of(Type::Int(IntKind::Int32)),
            Value::Int64(_) => Self::of(Type::Int(IntKind::Int64)),
            Value::Uint(_) => Self::of(Type::Int(IntKind::Uint)),
            Value::Uint8(_) => Self::of(Type::Int(IntKind::Uint8)),
            Value::Uint16(_) => Self::of(Type::Int(IntKind::Uint16)),
            Value::Uint32(_) => Self::of(Type::Int(IntKind::Uint32)),
            Value::Uint64(_) => Self::of(Type::Int(IntKind::Uint64)),
            Value::Float32(_) => Self::of(Type::Float(FloatKind::Float32)),
            Value::Float64(_) => Self::float(),
            Value::String(_) => Self::string(),
            Value::Time(_) => Self::of(Type::Time),
            Value::Duration(_) => Self::of(Type::Duration),
            Value::Array(items) => {
                let elem = items
                    .iter()
                    .map(Self::of_value)
                    .reduce(|a, b| a.lub(&b))
                    .map_or(Type::Any, |n| n.ty);
                Self::array_of(elem)
            }
            Value::Set(_) => Self::array_of(Type::Any),
            Value::Map(map) => {
                let fields: BTreeMap<EcoString, Nature> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::of_value(v)))
                    .collect();
                Self {
                    fields: Some(Arc::new(fields)),
                    ..Self::of(Type::map(Type::Any))
                }
            }
            Value::Struct(s) => Self::of(Type::Struct(s.ty.clone())),
            Value::Func(func) => Self::function(FuncInfo {
                name: func.name.clone(),
                types: func.types.clone(),
                typed: func.typed.as_ref().map(|t| t.signature()),
            }),
            Value::Pointer(inner) => {
                let inner = Self::of_value(inner);
                Self {
                    ty: Type::Pointer(Box::new(inner.ty)),
                    ..inner
                }
            }
            Value::Opaque(_) => Self::unknown(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.ty.deref().kind()
    }

    /// Unknown natures (and `nil`, whose shape is unknown) satisfy every
    /// operand constraint.
    pub fn is_unknown(&self) -> bool {
        matches!(self.ty.deref(), Type::Any) || self.nil
    }

    pub fn is_nil(&self) -> bool {
        self.nil
    }

    pub fn is(&self, kind: Kind) -> bool {
        self.kind() == kind
    }

    pub fn is_bool(&self) -> bool {
        self.is(Kind::Bool)
    }

    pub fn is_integer(&self) -> bool {
        self.is(Kind::Int)
    }

    pub fn is_float(&self) -> bool {
        self.is(Kind::Float)
    }

    pub fn is_number(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(&self) -> bool {
        self.is(Kind::String)
    }

    pub fn is_time(&self) -> bool {
        self.is(Kind::Time)
    }

    pub fn is_duration(&self) -> bool {
        self.is(Kind::Duration)
    }

    pub fn is_array(&self) -> bool {
        self.is(Kind::Array)
    }

    pub fn is_map(&self) -> bool {
        self.is(Kind::Map)
    }

    pub fn is_struct(&self) -> bool {
        self.is(Kind::Struct)
    }

    pub fn is_func(&self) -> bool {
        self.func.is_some() || self.is(Kind::Func)
    }

    /// Element of an array or value of a map; unknown otherwise.
    pub fn elem(&self) -> Nature {
        match self.ty.deref() {
            Type::Array(elem) | Type::Map(elem) => Nature::of((**elem).clone()),
            _ => Nature::unknown(),
        }
    }

    /// Known field or key of a struct or map.
    pub fn field(&self, name: &str) -> Option<Nature> {
        if let Some(fields) = &self.fields
            && let Some(found) = fields.get(name)
        {
            return Some(found.clone());
        }
        if let Type::Struct(st) = self.ty.deref() {
            return st.resolve_field(name).map(|(_, ty)| Nature::of(ty));
        }
        None
    }

    /// Least upper bound: the common type of two branches. `nil` is
    /// absorbed by the other side.
    pub fn lub(&self, other: &Nature) -> Nature {
        if self.nil {
            return other.clone();
        }
        if other.nil {
            return self.clone();
        }
        if self.ty == other.ty {
            let mut out = Nature::of(self.ty.clone());
            if self.fields == other.fields {
                out.fields = self.fields.clone();
            }
            return out;
        }
        Nature::unknown()
    }

    /// Whether a value of this nature can be passed where `target` is
    /// expected.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self.is_unknown() && !self.nil {
            return true;
        }
        if self.nil {
            return Type::Nil.assignable_to(target);
        }
        self.ty.assignable_to(target)
    }

    /// Whether `==` between the two natures can ever be true.
    pub fn comparable(&self, other: &Nature) -> bool {
        if self.is_unknown() || other.is_unknown() {
            return true;
        }
        if self.is_number() && other.is_number() {
            return true;
        }
        self.kind() == other.kind()
    }
}

impl std::fmt::Display for Nature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nil {
            return f.write_str("nil");
        }
        match (&self.func, &self.ty) {
            (Some(info), Type::Any) if !info.types.is_empty() => {
                write!(f, "{} (overloaded)", info.name)
            }
            _ => write!(f, "{}", self.ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lub_strips_nil() {
        assert_eq!(Nature::nil().lub(&Nature::int()), Nature::int());
        assert_eq!(Nature::string().lub(&Nature::nil()), Nature::string());
    }

    #[test]
    fn test_lub_of_different_types_is_unknown() {
        let lub = Nature::int().lub(&Nature::string());
        assert!(lub.is_unknown());
        assert!(!lub.nil);
    }

    #[test]
    fn test_of_value_array_elem() {
        let value = Value::array([Value::Int(1), Value::Int(2)]);
        assert_eq!(Nature::of_value(&value).ty, Type::array(Type::INT));
        let mixed = Value::array([Value::Int(1), Value::string("a")]);
        assert_eq!(Nature::of_value(&mixed).ty, Type::array(Type::Any));
    }

    #[test]
    fn test_of_value_map_fields() {
        let value = Value::map([("a", Value::Int(1)), ("b", Value::string("x"))]);
        let nature = Nature::of_value(&value);
        assert!(nature.is_map());
        assert_eq!(nature.field("a"), Some(Nature::int()));
        assert_eq!(nature.field("missing"), None);
    }

    #[test]
    fn test_comparable() {
        assert!(Nature::int().comparable(&Nature::float()));
        assert!(Nature::nil().comparable(&Nature::string()));
        assert!(!Nature::string().comparable(&Nature::bool()));
    }
}
