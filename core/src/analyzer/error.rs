use thiserror::Error;

use crate::api::{Diagnostic, ErrorKind};
use crate::diagnostics::Span;
use crate::diagnostics::context::Context;

/// Type error with context
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
    pub context: Vec<Context>,
}

/// Specific kinds of type errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeErrorKind {
    #[error("unknown name {name}")]
    UnknownName { name: String },

    #[error("type {ty} has no field {name}")]
    UnknownField { name: String, ty: String },

    #[error("type {ty} has no method {name}")]
    UnknownMethod { name: String, ty: String },

    #[error("unknown builtin {name}")]
    UnknownBuiltin { name: String },

    /// Operator or argument constraints violated; the message names both
    /// sides.
    #[error("{message}")]
    Mismatched { message: String },

    #[error("non-bool expression (type {found}) used as condition")]
    ExpectedBool { found: String },

    #[error("{} arguments to call {name}", .too_many.then_some("too many").unwrap_or("not enough"))]
    Arity { name: String, too_many: bool },

    #[error("{ty} is not callable")]
    NotAFunction { ty: String },

    #[error("array elements can only be selected using an integer (got {ty})")]
    NonIntegerIndex { ty: String },

    #[error("cannot slice {ty}")]
    CannotSlice { ty: String },

    #[error("{message}")]
    BadRegex { message: String },

    #[error("expected {expected}, but got {found}")]
    UnexpectedResult { expected: String, found: String },
}

impl TypeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            TypeErrorKind::UnknownName { .. } => "E001",
            TypeErrorKind::UnknownField { .. } => "E002",
            TypeErrorKind::UnknownMethod { .. } => "E003",
            TypeErrorKind::UnknownBuiltin { .. } => "E004",
            TypeErrorKind::Mismatched { .. } => "E005",
            TypeErrorKind::ExpectedBool { .. } => "E006",
            TypeErrorKind::Arity { .. } => "E007",
            TypeErrorKind::NotAFunction { .. } => "E008",
            TypeErrorKind::NonIntegerIndex { .. } => "E009",
            TypeErrorKind::CannotSlice { .. } => "E010",
            TypeErrorKind::BadRegex { .. } => "E011",
            TypeErrorKind::UnexpectedResult { .. } => "E012",
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            TypeErrorKind::UnknownName { .. } => ErrorKind::UnknownName,
            TypeErrorKind::UnknownField { .. } => ErrorKind::UnknownField,
            TypeErrorKind::UnknownMethod { .. } => ErrorKind::UnknownMethod,
            TypeErrorKind::UnknownBuiltin { .. } => ErrorKind::UnknownBuiltin,
            TypeErrorKind::Mismatched { .. }
            | TypeErrorKind::ExpectedBool { .. }
            | TypeErrorKind::UnexpectedResult { .. } => ErrorKind::TypeMismatch,
            TypeErrorKind::Arity { .. } => ErrorKind::Arity,
            TypeErrorKind::NotAFunction { .. } => ErrorKind::NotAFunction,
            TypeErrorKind::NonIntegerIndex { .. } => ErrorKind::NonIntegerIndex,
            TypeErrorKind::CannotSlice { .. } => ErrorKind::CannotSlice,
            TypeErrorKind::BadRegex { .. } => ErrorKind::BadRegex,
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            TypeErrorKind::UnknownName { .. } => {
                Some("Declare the name in the environment or allow undefined variables")
            }
            TypeErrorKind::UnknownField { .. } => Some("Check the field name for typos"),
            TypeErrorKind::Arity { .. } => {
                Some("Check the number of arguments in the function call")
            }
            _ => None,
        }
    }
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self {
            kind,
            span,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context.push(context);
        self
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic =
            Diagnostic::error(self.kind.error_kind(), self.kind.to_string(), self.span.clone())
                .with_code(self.kind.code());
        if let Some(help) = self.kind.help() {
            diagnostic = diagnostic.with_help(help);
        }
        diagnostic.related = self.context.iter().map(|c| c.to_related_info()).collect();
        diagnostic
    }
}

impl core::fmt::Display for TypeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} [{}]", self.kind, self.kind.code())
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_error_to_diagnostic() {
        let error = TypeError::new(
            TypeErrorKind::UnknownName {
                name: "x".to_string(),
            },
            Span::new(10, 11),
        );

        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.message, "unknown name x");
        assert_eq!(diagnostic.kind, ErrorKind::UnknownName);
        assert_eq!(diagnostic.code, Some("E001".to_string()));
        assert_eq!(diagnostic.span, Span::new(10, 11));
    }

    #[test]
    fn test_arity_message() {
        let kind = TypeErrorKind::Arity {
            name: "upper".to_string(),
            too_many: true,
        };
        assert_eq!(kind.to_string(), "too many arguments to call upper");
    }

    #[test]
    fn test_context_becomes_related_info() {
        let error = TypeError::new(
            TypeErrorKind::ExpectedBool {
                found: "int".to_string(),
            },
            Span::new(9, 10),
        )
        .with_context(Context::InPredicate {
            builtin: "filter".to_string(),
            span: Span::new(0, 6),
        });

        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.related.len(), 1);
        assert_eq!(diagnostic.related[0].message, "in predicate of 'filter'");
    }
}
