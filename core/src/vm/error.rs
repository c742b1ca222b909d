//! Runtime evaluation errors.
//!
//! Operations raise a span-less [`RuntimeError`]; the interpreter loop binds
//! it to the source span of the faulting instruction, producing an
//! [`ExecutionError`].
//!
//! # Error Categories
//!
//! - **Runtime errors**: type mismatches in polymorphic operations, division
//!   by zero, bad indexes, failing host functions.
//!
//! - **Resource errors**: the memory budget ran out or the host cancelled
//!   the run. These surface as `Error::ResourceExceeded` at the API.

use thiserror::Error;

use crate::api::{Diagnostic, ErrorKind};
use crate::diagnostics::{Location, Span};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// An operation does not accept its operand kinds.
    #[error("{0}")]
    TypeMismatch(String),

    #[error("integer divide by zero")]
    DivideByZero,

    #[error("index out of range: {index} (array length is {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("array elements can only be selected using an integer (got {ty})")]
    NonIntegerIndex { ty: String },

    #[error("cannot fetch {name} from {ty}")]
    UnknownDynamicField { name: String, ty: String },

    #[error("memory budget exceeded")]
    MemoryBudgetExceeded,

    #[error("execution cancelled")]
    Cancelled,

    /// A host function failed; its message is kept verbatim.
    #[error("{message}")]
    Host { name: String, message: String },

    #[error("{0}")]
    BadRegex(String),

    /// Malformed program or a broken VM invariant.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{ty} is not callable")]
    NotAFunction { ty: String },

    #[error("{} arguments to call {name}", .too_many.then_some("too many").unwrap_or("not enough"))]
    Arity { name: String, too_many: bool },
}

impl RuntimeError {
    pub fn mismatch(message: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RuntimeError::Internal(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::TypeMismatch(_) => "R001",
            RuntimeError::DivideByZero => "R002",
            RuntimeError::IndexOutOfRange { .. } => "R003",
            RuntimeError::NonIntegerIndex { .. } => "R004",
            RuntimeError::UnknownDynamicField { .. } => "R005",
            RuntimeError::MemoryBudgetExceeded => "R006",
            RuntimeError::Cancelled => "R007",
            RuntimeError::Host { .. } => "R008",
            RuntimeError::BadRegex(_) => "R009",
            RuntimeError::Internal(_) => "R010",
            RuntimeError::NotAFunction { .. } => "R011",
            RuntimeError::Arity { .. } => "R012",
        }
    }

    pub fn error_kind(&self) -> ErrorKind {
        match self {
            RuntimeError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            RuntimeError::DivideByZero => ErrorKind::DivideByZero,
            RuntimeError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            RuntimeError::NonIntegerIndex { .. } => ErrorKind::NonIntegerIndex,
            RuntimeError::UnknownDynamicField { .. } => ErrorKind::UnknownDynamicField,
            RuntimeError::MemoryBudgetExceeded => ErrorKind::MemoryBudgetExceeded,
            RuntimeError::Cancelled => ErrorKind::Cancelled,
            RuntimeError::Host { .. } => ErrorKind::HostError,
            RuntimeError::BadRegex(_) => ErrorKind::BadRegex,
            RuntimeError::Internal(_) => ErrorKind::Internal,
            RuntimeError::NotAFunction { .. } => ErrorKind::NotAFunction,
            RuntimeError::Arity { .. } => ErrorKind::Arity,
        }
    }

    /// Budget and cancellation stops, as opposed to faults of the
    /// expression itself.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            RuntimeError::MemoryBudgetExceeded | RuntimeError::Cancelled
        )
    }
}

/// A [`RuntimeError`] bound to the instruction that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionError {
    pub kind: RuntimeError,
    pub span: Span,
    pub location: Location,
}

impl ExecutionError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diagnostic =
            Diagnostic::error(self.kind.error_kind(), self.kind.to_string(), self.span.clone())
                .with_code(self.kind.code());
        diagnostic.location = self.location;
        diagnostic
    }
}

impl core::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.kind, self.location)
    }
}

impl std::error::Error for ExecutionError {}
