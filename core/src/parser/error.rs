use thiserror::Error;

use crate::api::{Diagnostic, ErrorKind, Severity};
use crate::diagnostics::Location;
use crate::diagnostics::Span;
use crate::diagnostics::context::Context;

/// Lexer or parser failure with context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub context: Vec<Context>,
}

/// Specific kinds of lex and parse errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("unexpected token {found}{}", .expected.as_ref().map(|e| format!(", expected {}", e)).unwrap_or_default())]
    UnexpectedToken {
        found: String,
        expected: Option<String>,
    },
    #[error("unexpected end of expression")]
    UnexpectedEof,
    #[error("expected comma between list elements, found {found}")]
    ExpectedComma { found: String },
    #[error("expected `:` after map key, found {found}")]
    ExpectedColon { found: String },
    #[error("unclosed `(`, found {found}")]
    UnclosedParen { found: String },
    #[error("unclosed `{open}`")]
    UnclosedBracket { open: char },
    #[error("literal not terminated")]
    UnterminatedString,
    #[error("bad number syntax: {text:?}")]
    BadNumber { text: String },
    #[error("unrecognized character: {ch:?}")]
    UnrecognizedChar { ch: char },
    #[error("unclosed comment")]
    UnclosedComment,
    #[error("invalid escape sequence {text:?}")]
    InvalidEscape { text: String },
    #[error("{message}")]
    InvalidPointer { message: String },
    #[error("expression nesting depth exceeds maximum of {max_depth} levels")]
    MaxDepthExceeded { max_depth: usize },
}

impl ParseErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::UnexpectedToken { .. } => "P001",
            ParseErrorKind::UnexpectedEof => "P002",
            ParseErrorKind::ExpectedComma { .. } => "P003",
            ParseErrorKind::ExpectedColon { .. } => "P004",
            ParseErrorKind::UnclosedParen { .. } => "P005",
            ParseErrorKind::UnclosedBracket { .. } => "P006",
            ParseErrorKind::UnterminatedString => "P007",
            ParseErrorKind::BadNumber { .. } => "P008",
            ParseErrorKind::UnrecognizedChar { .. } => "P009",
            ParseErrorKind::UnclosedComment => "P010",
            ParseErrorKind::InvalidEscape { .. } => "P011",
            ParseErrorKind::InvalidPointer { .. } => "P012",
            ParseErrorKind::MaxDepthExceeded { .. } => "P013",
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            ParseErrorKind::UnclosedBracket { .. } | ParseErrorKind::UnclosedParen { .. } => {
                Some("Add the missing closing delimiter")
            }
            ParseErrorKind::BadNumber { .. } => Some("Check the number format"),
            ParseErrorKind::MaxDepthExceeded { .. } => {
                Some("Reduce nesting or simplify the expression")
            }
            _ => None,
        }
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
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
        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone(),
            location: Location::default(),
            kind: ErrorKind::Syntax,
            related: self
                .context
                .iter()
                .map(|ctx| ctx.to_related_info())
                .collect(),
            help: self.kind.help().map(String::from).into_iter().collect(),
            code: Some(self.kind.code().to_string()),
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} [{}]", self.kind, self.kind.code())
    }
}

impl std::error::Error for ParseError {}
