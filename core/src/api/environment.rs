//! The host environment an expression is checked and evaluated against.

use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::EcoString;

use crate::analyzer::Nature;
use crate::types::{FieldPath, FunctionType, StructType, Type};
use crate::values::{Function, FunctionError, StructValue, Value};

/// Capability the engine uses to reach host data.
///
/// At compile time the checker asks for natures and struct layouts; at run
/// time the VM asks for values. An implementation is free to answer the
/// compile-time questions from a schema and the run-time ones from live
/// data, as long as the two agree.
pub trait Environment: Send + Sync {
    /// Runtime value of a top-level name.
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Compile-time nature of a top-level name.
    fn nature_of(&self, name: &str) -> Option<Nature> {
        self.lookup(name).map(|value| Nature::of_value(&value))
    }

    /// Index path of a top-level struct field, with its declared type.
    fn field_index(&self, _name: &str) -> Option<(FieldPath, Type)> {
        None
    }

    /// Runtime value at a path returned by [`field_index`](Self::field_index).
    fn load_field(&self, _path: &[u16]) -> Option<Value> {
        None
    }

    /// Slot and signature of a method of the environment itself.
    fn method_index(&self, _name: &str) -> Option<(u16, FunctionType)> {
        None
    }

    /// Method at a slot returned by [`method_index`](Self::method_index),
    /// bound to the environment.
    fn load_method(&self, _index: u16) -> Option<Function> {
        None
    }

    /// Strict environments reject unknown names at compile time.
    fn is_strict(&self) -> bool {
        true
    }
}

/// Keyed environment of named values.
///
/// ```
/// use exprel_core::api::{Environment, MapEnv};
/// use exprel_core::values::Value;
///
/// let env = MapEnv::new().with("answer", Value::Int(42));
/// assert_eq!(env.lookup("answer"), Some(Value::Int(42)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    values: BTreeMap<EcoString, Value>,
    lenient: bool,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<EcoString>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<EcoString>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Registers a host function under its own name.
    pub fn function(mut self, func: Function) -> Self {
        self.values.insert(func.name.clone(), Value::Func(func));
        self
    }

    /// Accepts undeclared names; they check as unknown and evaluate to
    /// `nil`.
    pub fn lenient(mut self) -> Self {
        self.lenient = true;
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Declared names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &EcoString> {
        self.values.keys()
    }
}

impl Environment for MapEnv {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }

    fn is_strict(&self) -> bool {
        !self.lenient
    }
}

impl From<BTreeMap<EcoString, Value>> for MapEnv {
    fn from(values: BTreeMap<EcoString, Value>) -> Self {
        Self {
            values,
            lenient: false,
        }
    }
}

impl<K: Into<EcoString>, V: Into<Value>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = MapEnv::new();
        for (k, v) in iter {
            env.insert(k, v);
        }
        env
    }
}

/// A struct value as an environment: its fields are the top-level names
/// and its methods are callable without a receiver.
impl Environment for StructValue {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.field(name) {
            return Some(value.clone());
        }
        let (index, _) = self.ty.method_index(name)?;
        self.load_method(index).map(Value::Func)
    }

    fn nature_of(&self, name: &str) -> Option<Nature> {
        if let Some((_, ty)) = self.ty.resolve_field(name) {
            // Interface-like fields take the nature of what they hold.
            if ty.is_any()
                && let Some(value) = self.field(name)
            {
                return Some(Nature::of_value(value));
            }
            return Some(Nature::of(ty));
        }
        None
    }

    fn field_index(&self, name: &str) -> Option<(FieldPath, Type)> {
        self.ty.resolve_field(name)
    }

    fn load_field(&self, path: &[u16]) -> Option<Value> {
        self.field_at(path).cloned()
    }

    fn method_index(&self, name: &str) -> Option<(u16, FunctionType)> {
        self.ty
            .method_index(name)
            .map(|(index, def)| (index, def.ty.clone()))
    }

    fn load_method(&self, index: u16) -> Option<Function> {
        let def = self.ty.methods.get(index as usize)?;
        Some(Function::bound(
            def.name.clone(),
            Value::Struct(Arc::new(self.clone())),
            def.imp.clone(),
        ))
    }
}

/// Dynamic values: maps act like [`MapEnv`], structs like [`StructValue`],
/// anything else is an empty environment.
impl Environment for Value {
    fn lookup(&self, name: &str) -> Option<Value> {
        match self.deref_all() {
            Value::Map(map) => map.get(name).cloned(),
            Value::Struct(s) => s.lookup(name),
            _ => None,
        }
    }

    fn nature_of(&self, name: &str) -> Option<Nature> {
        match self.deref_all() {
            Value::Struct(s) => s.nature_of(name),
            _ => self.lookup(name).map(|value| Nature::of_value(&value)),
        }
    }

    fn field_index(&self, name: &str) -> Option<(FieldPath, Type)> {
        match self.deref_all() {
            Value::Struct(s) => s.field_index(name),
            _ => None,
        }
    }

    fn load_field(&self, path: &[u16]) -> Option<Value> {
        match self.deref_all() {
            Value::Struct(s) => s.load_field(path),
            _ => None,
        }
    }

    fn method_index(&self, name: &str) -> Option<(u16, FunctionType)> {
        match self.deref_all() {
            Value::Struct(s) => s.method_index(name),
            _ => None,
        }
    }

    fn load_method(&self, index: u16) -> Option<Function> {
        match self.deref_all() {
            Value::Struct(s) => s.load_method(index),
            _ => None,
        }
    }
}

/// Builder for an engine's global environment.
///
/// ```
/// use exprel_core::api::EnvironmentBuilder;
/// use exprel_core::values::Value;
///
/// let mut env = EnvironmentBuilder::new();
/// env.register("pi", Value::Float64(std::f64::consts::PI));
/// env.function("double", |args| Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2)));
/// let env = env.build();
/// assert_eq!(env.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct EnvironmentBuilder {
    entries: Vec<(EcoString, Value)>,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a global value. A later registration of the same name wins.
    pub fn register(&mut self, name: impl Into<EcoString>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Registers an untyped host function.
    pub fn function<F>(&mut self, name: &str, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.register(name, Function::new(name, func));
    }

    /// Registers a struct value; its fields are reachable as `name.Field`.
    pub fn register_struct(&mut self, name: impl Into<EcoString>, value: StructValue) {
        self.register(name, Value::Struct(Arc::new(value)));
    }

    pub fn build(self) -> MapEnv {
        self.entries.into_iter().collect()
    }
}

/// Declared shape for environments known only by type at compile time.
///
/// Checking against a schema resolves fields and methods statically; the
/// values are supplied later to `run`.
#[derive(Debug, Clone)]
pub struct Schema {
    ty: Arc<StructType>,
}

impl Schema {
    pub fn new(ty: Arc<StructType>) -> Self {
        Self { ty }
    }
}

impl Environment for Schema {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }

    fn nature_of(&self, name: &str) -> Option<Nature> {
        if let Some((_, ty)) = self.ty.resolve_field(name) {
            return Some(Nature::of(ty));
        }
        self.ty
            .method_index(name)
            .map(|(index, def)| Nature {
                method: Some(index),
                ..Nature::of(Type::Func(Arc::new(def.ty.clone())))
            })
    }

    fn field_index(&self, name: &str) -> Option<(FieldPath, Type)> {
        self.ty.resolve_field(name)
    }

    fn method_index(&self, name: &str) -> Option<(u16, FunctionType)> {
        self.ty
            .method_index(name)
            .map(|(index, def)| (index, def.ty.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user_type() -> Arc<StructType> {
        Arc::new(
            StructType::new("User")
                .field("Name", Type::String)
                .field("Age", Type::INT)
                .method(
                    "Greet",
                    FunctionType::new(vec![], Type::String),
                    |receiver, _args| {
                        let name = receiver
                            .lookup("Name")
                            .and_then(|v| v.as_str().map(String::from))
                            .unwrap_or_default();
                        Ok(Value::string(format!("hi {}", name)))
                    },
                ),
        )
    }

    #[test]
    fn test_map_env_is_strict_unless_lenient() {
        let env = MapEnv::new().with("a", 1i64);
        assert!(env.is_strict());
        assert!(!env.lenient().is_strict());
    }

    #[test]
    fn test_struct_env_fields_and_methods() {
        let user = StructValue::new(user_type(), vec![Value::string("ann"), Value::Int(30)]);
        assert_eq!(user.lookup("Age"), Some(Value::Int(30)));
        let (path, ty) = user.field_index("Name").unwrap();
        assert_eq!(path.as_slice(), &[0]);
        assert_eq!(ty, Type::String);
        assert_eq!(user.load_field(&path), Some(Value::string("ann")));

        let (index, _) = user.method_index("Greet").unwrap();
        let Some(greet) = user.load_method(index) else {
            panic!("method not bound");
        };
        assert_eq!(greet.name, "Greet");
    }

    #[test]
    fn test_schema_has_no_values() {
        let schema = Schema::new(user_type());
        assert_eq!(schema.lookup("Name"), None);
        assert_eq!(schema.nature_of("Name"), Some(Nature::string()));
        assert_eq!(schema.nature_of("Greet").and_then(|n| n.method), Some(0));
    }
}
