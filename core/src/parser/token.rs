use core::fmt;

use ecow::EcoString;

use crate::diagnostics::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Integer,
    Float,
    String,
    Operator,
    Bracket,
    /// `#`, `#index` or `#acc`; the value holds the name after `#`.
    Pointer,
    Eof,
}

/// A lexed token. `value` is the lexeme, except for strings where it is the
/// decoded contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: EcoString,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<EcoString>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn is(&self, kind: TokenKind, value: &str) -> bool {
        self.kind == kind && self.value == value
    }

    pub fn is_operator(&self, value: &str) -> bool {
        self.is(TokenKind::Operator, value)
    }

    pub fn is_bracket(&self, value: &str) -> bool {
        self.is(TokenKind::Bracket, value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("EOF"),
            kind => write!(f, "{:?}({:?})", kind, self.value.as_str()),
        }
    }
}
