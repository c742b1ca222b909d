//! Source text to tokens.

use ecow::EcoString;

use super::error::{ParseError, ParseErrorKind};
use super::token::{Token, TokenKind};
use crate::diagnostics::Span;

const WORD_OPERATORS: &[&str] = &[
    "and",
    "or",
    "not",
    "in",
    "matches",
    "contains",
    "startsWith",
    "endsWith",
];

const TWO_CHAR_OPERATORS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||", "??", "**", ".."];

/// Scans `source` into tokens terminated by an `Eof` token.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        source,
        pos: 0,
        tokens: Vec::new(),
        brackets: Vec::new(),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    brackets: Vec<(char, Span)>,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn accept(&mut self, valid: &str) -> bool {
        match self.peek() {
            Some(c) if valid.contains(c) => {
                self.pos += c.len_utf8();
                true
            }
            _ => false,
        }
    }

    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    fn emit(&mut self, kind: TokenKind, start: usize) {
        let text = &self.source[start..self.pos];
        self.tokens
            .push(Token::new(kind, text, Span::new(start, self.pos)));
    }

    fn error(&self, kind: ParseErrorKind, start: usize) -> ParseError {
        ParseError::new(kind, Span::new(start, self.pos.max(start + 1)))
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '"' | '\'' => self.string(c)?,
                '`' => self.raw_string()?,
                '0'..='9' => self.number()?,
                '.' if matches!(self.peek_nth(1), Some('0'..='9')) => self.number()?,
                '/' if matches!(self.peek_nth(1), Some('/' | '*')) => self.comment()?,
                '#' => self.pointer(),
                '(' | '[' | '{' => {
                    self.bump();
                    self.brackets.push((c, Span::new(start, self.pos)));
                    self.emit(TokenKind::Bracket, start);
                }
                ')' | ']' | '}' => self.close_bracket(c)?,
                c if is_identifier_start(c) => self.identifier(),
                _ => self.operator(c)?,
            }
        }
        if let Some((open, span)) = self.brackets.pop() {
            return Err(ParseError::new(ParseErrorKind::UnclosedBracket { open }, span));
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, "", Span::new(self.pos, self.pos)));
        Ok(())
    }

    fn close_bracket(&mut self, close: char) -> Result<(), ParseError> {
        let start = self.pos;
        self.bump();
        let expected = match close {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.brackets.pop() {
            Some((open, _)) if open == expected => {
                self.emit(TokenKind::Bracket, start);
                Ok(())
            }
            Some((open, _)) => Err(self.error(ParseErrorKind::UnclosedBracket { open }, start)),
            None => Err(self.error(
                ParseErrorKind::UnexpectedToken {
                    found: close.to_string(),
                    expected: None,
                },
                start,
            )),
        }
    }

    fn comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.bump();
        if self.accept("/") {
            while let Some(c) = self.bump() {
                if c == '\n' {
                    break;
                }
            }
            return Ok(());
        }
        self.bump();
        loop {
            match self.bump() {
                None => return Err(self.error(ParseErrorKind::UnclosedComment, start)),
                Some('*') if self.accept("/") => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn pointer(&mut self) {
        let start = self.pos;
        self.bump();
        let name_start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.bump();
        }
        let name = &self.source[name_start..self.pos];
        self.tokens
            .push(Token::new(TokenKind::Pointer, name, Span::new(start, self.pos)));
    }

    fn identifier(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.bump();
        }
        let word = &self.source[start..self.pos];
        if word == "not" && self.coalesce_not_in(start) {
            return;
        }
        if WORD_OPERATORS.contains(&word) {
            self.emit(TokenKind::Operator, start);
        } else {
            self.emit(TokenKind::Identifier, start);
        }
    }

    /// Turns `not` followed by `in` into a single `not in` operator.
    fn coalesce_not_in(&mut self, start: usize) -> bool {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        let skipped = rest.len() - trimmed.len();
        let is_in = skipped > 0
            && trimmed.starts_with("in")
            && !trimmed[2..].chars().next().is_some_and(is_identifier_char);
        if !is_in {
            return false;
        }
        self.pos += skipped + 2;
        self.tokens.push(Token::new(
            TokenKind::Operator,
            "not in",
            Span::new(start, self.pos),
        ));
        true
    }

    fn operator(&mut self, c: char) -> Result<(), ParseError> {
        let start = self.pos;
        let rest = &self.source[start..];
        if let Some(op) = TWO_CHAR_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
            self.emit(TokenKind::Operator, start);
            return Ok(());
        }
        // `?.` unless it is `? .5`
        if rest.starts_with("?.") && !matches!(rest[2..].chars().next(), Some('0'..='9')) {
            self.pos += 2;
            self.emit(TokenKind::Operator, start);
            return Ok(());
        }
        if "+-*/%^!<>=.,:?|;".contains(c) {
            self.bump();
            self.emit(TokenKind::Operator, start);
            return Ok(());
        }
        self.bump();
        Err(self.error(ParseErrorKind::UnrecognizedChar { ch: c }, start))
    }

    fn number(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let mut digits = "0123456789_";
        let mut decimal = true;
        if self.accept("0") {
            if self.accept("xX") {
                digits = "0123456789abcdefABCDEF_";
                decimal = false;
            } else if self.accept("oO") {
                digits = "01234567_";
                decimal = false;
            } else if self.accept("bB") {
                digits = "01_";
                decimal = false;
            }
        }
        self.accept_run(digits);
        let mut float = false;
        if decimal && self.peek() == Some('.') && self.peek_nth(1) != Some('.') {
            self.bump();
            self.accept_run(digits);
            float = true;
        }
        if decimal && self.accept("eE") {
            self.accept("+-");
            self.accept_run(digits);
            float = true;
        }
        if self.peek().is_some_and(is_identifier_char) {
            self.bump();
            let text = self.source[start..self.pos].to_string();
            return Err(self.error(ParseErrorKind::BadNumber { text }, start));
        }
        let kind = if float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        self.emit(kind, start);
        Ok(())
    }

    fn string(&mut self, quote: char) -> Result<(), ParseError> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ParseError::new(
                    ParseErrorKind::UnterminatedString,
                    Span::new(start, start + 1),
                ));
            };
            match c {
                c if c == quote => break,
                '\\' => {
                    let escape_start = self.pos - 1;
                    let decoded = self.escape().ok_or_else(|| {
                        let text = self.source[escape_start..self.pos].to_string();
                        self.error(ParseErrorKind::InvalidEscape { text }, escape_start)
                    })?;
                    value.push(decoded);
                }
                '\r' => {
                    self.accept("\n");
                    value.push('\n');
                }
                c => value.push(c),
            }
        }
        self.tokens.push(Token::new(
            TokenKind::String,
            EcoString::from(value),
            Span::new(start, self.pos),
        ));
        Ok(())
    }

    fn escape(&mut self) -> Option<char> {
        let c = self.bump()?;
        Some(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0C}',
            'v' => '\u{0B}',
            '0' => '\0',
            '\\' | '"' | '\'' | '`' => c,
            'x' => self.hex_escape(2)?,
            'u' if self.accept("{") => {
                let start = self.pos;
                self.accept_run("0123456789abcdefABCDEF");
                let digits = &self.source[start..self.pos];
                if digits.is_empty() || digits.len() > 6 || !self.accept("}") {
                    return None;
                }
                char::from_u32(u32::from_str_radix(digits, 16).ok()?)?
            }
            'u' => self.hex_escape(4)?,
            'U' => self.hex_escape(8)?,
            _ => return None,
        })
    }

    fn hex_escape(&mut self, len: usize) -> Option<char> {
        let digits = self.source.get(self.pos..self.pos + len)?;
        let code = u32::from_str_radix(digits, 16).ok()?;
        self.pos += len;
        char::from_u32(code)
    }

    fn raw_string(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.bump();
        let Some(len) = self.source[self.pos..].find('`') else {
            return Err(ParseError::new(
                ParseErrorKind::UnterminatedString,
                Span::new(start, start + 1),
            ));
        };
        let value = self.source[self.pos..self.pos + len].replace("\r\n", "\n");
        self.pos += len + 1;
        self.tokens.push(Token::new(
            TokenKind::String,
            value,
            Span::new(start, self.pos),
        ));
        Ok(())
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_identifier_char(c: char) -> bool {
    is_identifier_start(c) || c.is_numeric()
}

/// Decodes an integer lexeme with optional radix prefix and `_` separators.
pub(crate) fn parse_integer(text: &str) -> Option<i64> {
    parse_magnitude(text).and_then(|value| i64::try_from(value).ok())
}

/// Unsigned value of an integer literal; `i64::MIN` is only reachable as
/// the negation of a magnitude one past `i64::MAX`.
pub(crate) fn parse_magnitude(text: &str) -> Option<u64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let (digits, radix) = match clean.get(..2) {
        Some("0x" | "0X") => (&clean[2..], 16),
        Some("0o" | "0O") => (&clean[2..], 8),
        Some("0b" | "0B") => (&clean[2..], 2),
        _ => (clean.as_str(), 10),
    };
    u64::from_str_radix(digits, radix).ok()
}

pub(crate) fn parse_float(text: &str) -> Option<f64> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    clean.parse().ok()
}
