//! Public error types.
//!
//! Every stage has its own internal error type; at the API boundary they
//! are converted into [`Diagnostic`]s and wrapped in [`Error`], which keeps
//! the source text so the message can be rendered with a pointed snippet.

use std::fmt;
use std::sync::Arc;

use crate::diagnostics::{Located, Location, Source, Span};

/// Public error type for all engine operations.
#[derive(Debug, Clone)]
pub enum Error {
    /// Invalid API usage (unknown function to relink, corrupt program bytes).
    Api(String),

    /// Lexing, parsing, checking or compilation failed.
    ///
    /// Contains one or more diagnostics; the first is the primary failure.
    Compilation {
        diagnostics: Vec<Diagnostic>,
        source: Arc<Source>,
    },

    /// Evaluation failed at a specific instruction.
    Runtime {
        diagnostic: Diagnostic,
        source: Arc<Source>,
    },

    /// The memory budget was exhausted or execution was cancelled.
    ResourceExceeded {
        diagnostic: Diagnostic,
        source: Arc<Source>,
    },
}

impl Error {
    /// The primary diagnostic, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Error::Api(_) => None,
            Error::Compilation { diagnostics, .. } => diagnostics.first(),
            Error::Runtime { diagnostic, .. } | Error::ResourceExceeded { diagnostic, .. } => {
                Some(diagnostic)
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.diagnostic().map_or(ErrorKind::Api, |d| d.kind)
    }

    pub fn location(&self) -> Option<Location> {
        self.diagnostic().map(|d| d.location)
    }

    pub fn message(&self) -> String {
        match self {
            Error::Api(msg) => msg.clone(),
            _ => self
                .diagnostic()
                .map(|d| d.message.clone())
                .unwrap_or_default(),
        }
    }

    pub fn source(&self) -> Option<&Source> {
        match self {
            Error::Api(_) => None,
            Error::Compilation { source, .. }
            | Error::Runtime { source, .. }
            | Error::ResourceExceeded { source, .. } => Some(source),
        }
    }

    /// The primary message bound to its location and source snippet.
    pub fn located(&self) -> Option<Located> {
        let diagnostic = self.diagnostic()?;
        let located = Located::new(diagnostic.message.clone(), diagnostic.location);
        Some(match self.source() {
            Some(source) => located.bind(source),
            None => located,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Api(msg) => write!(f, "API error: {}", msg),
            _ => match self.located() {
                Some(located) => write!(f, "{}", located),
                None => f.write_str("compilation failed"),
            },
        }
    }
}

impl std::error::Error for Error {}

/// Error taxonomy shared by every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Api,
    Syntax,
    UnknownName,
    UnknownField,
    UnknownMethod,
    UnknownBuiltin,
    Arity,
    TypeMismatch,
    NotAFunction,
    NonIntegerIndex,
    CannotSlice,
    BadRegex,
    DivideByZero,
    IndexOutOfRange,
    UnknownDynamicField,
    MemoryBudgetExceeded,
    Cancelled,
    HostError,
    /// Program too large to encode.
    Limit,
    /// Malformed program or VM invariant violated.
    Internal,
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,

    pub message: String,

    /// Byte range of the primary issue.
    pub span: Span,

    /// Line/column of `span.start`.
    pub location: Location,

    pub kind: ErrorKind,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Suggestions for fixing the issue.
    pub help: Vec<String>,

    /// Error code (e.g., "E001") for documentation lookup.
    pub code: Option<String>,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            location: Location::default(),
            kind,
            related: Vec::new(),
            help: Vec::new(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Computes `location` from `span` against `source`.
    pub fn locate(mut self, source: &Source) -> Self {
        self.location = source.location(self.span.start());
        self
    }
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "defined here").
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}

// ============================================================================
// Conversion from internal errors
// ============================================================================

impl Error {
    pub(crate) fn compilation(diagnostics: Vec<Diagnostic>, source: &Arc<Source>) -> Self {
        Error::Compilation {
            diagnostics: diagnostics.into_iter().map(|d| d.locate(source)).collect(),
            source: source.clone(),
        }
    }

    pub(crate) fn from_parse(err: crate::parser::ParseError, source: &Arc<Source>) -> Self {
        Self::compilation(vec![err.to_diagnostic()], source)
    }

    pub(crate) fn from_type_errors(
        errors: Vec<crate::analyzer::TypeError>,
        source: &Arc<Source>,
    ) -> Self {
        Self::compilation(errors.iter().map(|e| e.to_diagnostic()).collect(), source)
    }

    pub(crate) fn from_compile(err: crate::compiler::CompileError, source: &Arc<Source>) -> Self {
        Self::compilation(vec![err.to_diagnostic()], source)
    }

    pub(crate) fn from_execution(err: crate::vm::ExecutionError, source: &Arc<Source>) -> Self {
        let resource = err.kind.is_resource();
        let mut diagnostic = err.to_diagnostic();
        diagnostic.location = err.location;
        let source = source.clone();
        if resource {
            Error::ResourceExceeded { diagnostic, source }
        } else {
            Error::Runtime { diagnostic, source }
        }
    }

    pub(crate) fn from_persist(err: crate::vm::PersistError) -> Self {
        Error::Api(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_binds_snippet() {
        let source = Arc::new(Source::new("a +\n  b / 0"));
        let err = Error::Runtime {
            diagnostic: Diagnostic::error(
                ErrorKind::DivideByZero,
                "integer divide by zero",
                Span::new(8, 9),
            )
            .locate(&source),
            source,
        };
        assert_eq!(err.kind(), ErrorKind::DivideByZero);
        assert_eq!(err.location(), Some(Location::new(2, 4)));
        assert_eq!(
            err.to_string(),
            "integer divide by zero (2:5)\n |   b / 0\n | ....^"
        );
    }

    #[test]
    fn test_api_error_has_no_location() {
        let err = Error::Api("unknown function foo".into());
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.location(), None);
        assert_eq!(err.to_string(), "API error: unknown function foo");
    }
}
