//! Errors raised after checking: by the optimizer while folding and by the
//! bytecode compiler when a program outgrows its encoding.

use thiserror::Error;

use crate::api::{Diagnostic, ErrorKind};
use crate::diagnostics::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
    /// Constant division or modulo by zero.
    #[error("integer divide by zero")]
    DivideByZero,

    /// A constant-evaluated host function failed.
    #[error("compile error: {name}: {message}")]
    ConstExpr { name: String, message: String },

    /// Constant pool index no longer fits 16 bits.
    #[error("too many constants (limit: 65536)")]
    TooManyConstants,

    /// Jump distance no longer fits 16 bits.
    #[error("jump distance too large (limit: 65535 instructions)")]
    JumpTooFar,
}

impl CompileErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorKind::DivideByZero => "C001",
            CompileErrorKind::ConstExpr { .. } => "C002",
            CompileErrorKind::TooManyConstants | CompileErrorKind::JumpTooFar => "C003",
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            CompileErrorKind::DivideByZero => ErrorKind::DivideByZero,
            CompileErrorKind::ConstExpr { .. } => ErrorKind::HostError,
            CompileErrorKind::TooManyConstants | CompileErrorKind::JumpTooFar => ErrorKind::Limit,
        }
    }
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.error_kind(), self.kind.to_string(), self.span.clone())
            .with_code(self.kind.code())
    }
}

impl core::fmt::Display for CompileError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} [{}]", self.kind, self.kind.code())
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_error_to_diagnostic() {
        let err = CompileError::new(CompileErrorKind::DivideByZero, Span::new(2, 7));
        let diagnostic = err.to_diagnostic();
        assert_eq!(diagnostic.message, "integer divide by zero");
        assert_eq!(diagnostic.kind, ErrorKind::DivideByZero);
        assert_eq!(diagnostic.code, Some("C001".to_string()));
        assert_eq!(err.to_string(), "integer divide by zero [C001]");
    }
}
