use core::fmt;

use super::Type;

/// Signature of a host function or method.
///
/// A variadic signature accepts any number of trailing arguments of the
/// last parameter's type.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub ret: Type,
    pub variadic: bool,
}

impl FunctionType {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            ret,
            variadic: false,
        }
    }

    pub fn variadic(params: Vec<Type>, ret: Type) -> Self {
        Self {
            params,
            ret,
            variadic: true,
        }
    }

    /// Minimum number of arguments a call must supply.
    pub fn min_args(&self) -> usize {
        if self.variadic {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.min_args()
        } else {
            count == self.params.len()
        }
    }

    /// Declared type of the `index`-th argument.
    pub fn param(&self, index: usize) -> Option<&Type> {
        match self.params.get(index) {
            Some(ty) if !(self.variadic && index + 1 == self.params.len()) => Some(ty),
            _ if self.variadic => self.params.last(),
            other => other,
        }
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if self.variadic && i + 1 == self.params.len() {
                f.write_str("...")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")?;
        if !matches!(self.ret, Type::Nil) {
            write!(f, " {}", self.ret)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_variadic_params() {
        let ty = FunctionType::variadic(vec![Type::String, Type::Any], Type::String);
        assert_eq!(ty.min_args(), 1);
        assert!(ty.accepts_count(1));
        assert!(ty.accepts_count(4));
        assert_eq!(ty.param(3), Some(&Type::Any));
        assert_eq!(ty.param(0), Some(&Type::String));
        assert_eq!(ty.to_string(), "func(string, ...any) string");
    }

    #[test]
    fn test_fixed_params() {
        let ty = FunctionType::new(vec![Type::INT], Type::Bool);
        assert!(!ty.accepts_count(2));
        assert_eq!(ty.param(1), None);
    }
}
