use std::sync::Arc;

use ecow::EcoString;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{FunctionType, Type};
use crate::values::{FunctionError, Value};

/// Positional route from a struct to a (possibly embedded) field.
pub type FieldPath = SmallVec<[u16; 4]>;

/// Implementation of a struct method; receives the receiver first.
pub type MethodFn = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: EcoString,
    /// Name override taken from an `expr` tag.
    pub tag: Option<EcoString>,
    pub ty: Type,
    /// Embedded structs expose their fields on the parent.
    pub embedded: bool,
}

impl FieldDef {
    /// Name the field is reachable under from expressions.
    pub fn exposed_name(&self) -> &str {
        self.tag.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Clone)]
pub struct MethodDef {
    pub name: EcoString,
    pub ty: FunctionType,
    pub imp: MethodFn,
}

impl core::fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

/// Description of a host record type.
#[derive(Debug, Clone, Default)]
pub struct StructType {
    pub name: EcoString,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
}

impl StructType {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<EcoString>, ty: Type) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            tag: None,
            ty,
            embedded: false,
        });
        self
    }

    /// Adds a field renamed by an `expr` tag.
    pub fn tagged_field(
        mut self,
        name: impl Into<EcoString>,
        tag: impl Into<EcoString>,
        ty: Type,
    ) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            tag: Some(tag.into()),
            ty,
            embedded: false,
        });
        self
    }

    pub fn embed(mut self, inner: Arc<StructType>) -> Self {
        self.fields.push(FieldDef {
            name: inner.name.clone(),
            tag: None,
            ty: Type::Struct(inner),
            embedded: true,
        });
        self
    }

    pub fn method<F>(mut self, name: impl Into<EcoString>, ty: FunctionType, imp: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.methods.push(MethodDef {
            name: name.into(),
            ty,
            imp: Arc::new(imp),
        });
        self
    }

    pub fn into_type(self) -> Type {
        Type::Struct(Arc::new(self))
    }

    /// Resolves `name` to a field path, searching own fields before
    /// promoted fields of embedded structs (shallowest wins).
    pub fn resolve_field(&self, name: &str) -> Option<(FieldPath, Type)> {
        for (i, field) in self.fields.iter().enumerate() {
            if field.exposed_name() == name {
                let mut path = FieldPath::new();
                path.push(i as u16);
                return Some((path, field.ty.clone()));
            }
        }
        for (i, field) in self.fields.iter().enumerate() {
            if !field.embedded {
                continue;
            }
            if let Type::Struct(inner) = field.ty.deref()
                && let Some((rest, ty)) = inner.resolve_field(name)
            {
                let mut path = FieldPath::new();
                path.push(i as u16);
                path.extend(rest);
                return Some((path, ty));
            }
        }
        None
    }

    pub fn method_index(&self, name: &str) -> Option<(u16, &MethodDef)> {
        self.methods
            .iter()
            .enumerate()
            .find(|(_, m)| m.name == name)
            .map(|(i, m)| (i as u16, m))
    }

    pub fn field_names(&self) -> Vec<EcoString> {
        let mut names = Vec::new();
        for field in &self.fields {
            if field.embedded
                && let Type::Struct(inner) = field.ty.deref()
            {
                names.extend(inner.field_names());
            } else {
                names.push(field.exposed_name().into());
            }
        }
        names
    }
}

/// Resolved access to a struct field, produced at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub path: FieldPath,
    pub name: EcoString,
}

/// Resolved access to a struct method, produced at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub index: u16,
    pub name: EcoString,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    fn user() -> StructType {
        let base = Arc::new(StructType::new("Base").field("ID", Type::INT));
        StructType::new("User")
            .tagged_field("Name", "name", Type::String)
            .embed(base)
            .field("Age", Type::INT)
    }

    #[test]
    fn test_tag_renames_field() {
        let user = user();
        assert!(user.resolve_field("Name").is_none());
        let (path, ty) = user.resolve_field("name").unwrap();
        assert_eq!(path, FieldPath::from_slice(&[0]));
        assert_eq!(ty, Type::String);
    }

    #[test]
    fn test_embedded_field_is_promoted() {
        let (path, ty) = user().resolve_field("ID").unwrap();
        let expected: FieldPath = smallvec![1, 0];
        assert_eq!(path, expected);
        assert_eq!(ty, Type::INT);
    }

    #[test]
    fn test_field_names_flatten_embedded() {
        let names: Vec<EcoString> = vec!["name".into(), "ID".into(), "Age".into()];
        assert_eq!(user().field_names(), names);
    }
}
