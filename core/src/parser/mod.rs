//! Lexer and Pratt parser.
//!
//! [`parse`] turns source text into an [`Ast`](crate::ast::Ast). Lexing
//! and parsing failures share [`ParseError`].

pub mod error;
pub mod lexer;
pub mod operator;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod token;

pub use crate::diagnostics::Span;
pub use error::{ParseError, ParseErrorKind};
pub use lexer::lex;
pub use parser::{DEFAULT_MAX_DEPTH, PREDICATE_BUILTINS, parse, parse_with_max_depth};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod precedence_test;
