//! Callable values: host functions, builtins and bound struct methods.

use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use thiserror::Error;

use super::Value;
use crate::builtins::BuiltinFn;
use crate::types::{FunctionType, MethodFn, Type};

/// Error returned by a host function. The VM reports it with the
/// location of the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    pub message: String,
}

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Signature of an untyped host function.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// Fast-path host function of a fixed no-argument signature, invoked by
/// `CallTyped` without going through `&[Value]`.
#[derive(Clone)]
pub enum TypedFn {
    Bool(Arc<dyn Fn() -> bool + Send + Sync>),
    Int(Arc<dyn Fn() -> i64 + Send + Sync>),
    Uint(Arc<dyn Fn() -> u64 + Send + Sync>),
    Int64(Arc<dyn Fn() -> i64 + Send + Sync>),
    Uint64(Arc<dyn Fn() -> u64 + Send + Sync>),
    Float64(Arc<dyn Fn() -> f64 + Send + Sync>),
    String(Arc<dyn Fn() -> String + Send + Sync>),
    Any(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl TypedFn {
    /// Index into the `CallTyped` dispatch table.
    pub fn signature(&self) -> u16 {
        match self {
            TypedFn::Bool(_) => 0,
            TypedFn::Int(_) => 1,
            TypedFn::Uint(_) => 2,
            TypedFn::Int64(_) => 3,
            TypedFn::Uint64(_) => 4,
            TypedFn::Float64(_) => 5,
            TypedFn::String(_) => 6,
            TypedFn::Any(_) => 7,
        }
    }

    pub fn return_type(&self) -> Type {
        use crate::types::{FloatKind, IntKind};
        match self {
            TypedFn::Bool(_) => Type::Bool,
            TypedFn::Int(_) => Type::Int(IntKind::Int),
            TypedFn::Uint(_) => Type::Int(IntKind::Uint),
            TypedFn::Int64(_) => Type::Int(IntKind::Int64),
            TypedFn::Uint64(_) => Type::Int(IntKind::Uint64),
            TypedFn::Float64(_) => Type::Float(FloatKind::Float64),
            TypedFn::String(_) => Type::String,
            TypedFn::Any(_) => Type::Any,
        }
    }

    pub fn invoke(&self) -> Value {
        match self {
            TypedFn::Bool(f) => Value::Bool(f()),
            TypedFn::Int(f) => Value::Int(f()),
            TypedFn::Uint(f) => Value::Uint(f()),
            TypedFn::Int64(f) => Value::Int64(f()),
            TypedFn::Uint64(f) => Value::Uint64(f()),
            TypedFn::Float64(f) => Value::Float64(f()),
            TypedFn::String(f) => Value::String(f().into()),
            TypedFn::Any(f) => f(),
        }
    }
}

/// What a [`Function`] runs when called.
#[derive(Clone)]
pub enum Callable {
    Native(Arc<NativeFn>),
    Builtin(BuiltinFn),
    /// Struct method bound to its receiver.
    Bound { receiver: Arc<Value>, imp: MethodFn },
}

/// A named callable value with optional declared signatures.
///
/// An empty `types` list means the function accepts anything and returns
/// an unknown type; several entries declare overloads.
#[derive(Clone)]
pub struct Function {
    pub name: EcoString,
    pub callable: Callable,
    pub types: Vec<FunctionType>,
    pub typed: Option<TypedFn>,
}

impl Function {
    pub fn new<F>(name: impl Into<EcoString>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            callable: Callable::Native(Arc::new(func)),
            types: Vec::new(),
            typed: None,
        }
    }

    /// Declares a signature; repeated calls add overloads.
    pub fn with_type(mut self, ty: FunctionType) -> Self {
        self.types.push(ty);
        self
    }

    pub fn typed(name: impl Into<EcoString>, typed: TypedFn) -> Self {
        let ret = typed.return_type();
        let call = typed.clone();
        Self {
            name: name.into(),
            callable: Callable::Native(Arc::new(move |_args: &[Value]| Ok(call.invoke()))),
            types: vec![FunctionType::new(Vec::new(), ret)],
            typed: Some(typed),
        }
    }

    pub(crate) fn builtin(name: &str, func: BuiltinFn) -> Self {
        Self {
            name: name.into(),
            callable: Callable::Builtin(func),
            types: Vec::new(),
            typed: None,
        }
    }

    pub(crate) fn bound(name: EcoString, receiver: Value, imp: MethodFn) -> Self {
        Self {
            name,
            callable: Callable::Bound {
                receiver: Arc::new(receiver),
                imp,
            },
            types: Vec::new(),
            typed: None,
        }
    }

    /// True for `func(...any) any`, the shape `CallFast` skips checks for.
    pub fn is_variadic_any(&self) -> bool {
        matches!(self.types.as_slice(), [ty]
            if ty.variadic && ty.params.len() == 1 && ty.params[0].is_any() && ty.ret.is_any())
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("types", &self.types)
            .finish_non_exhaustive()
    }
}
