use core::fmt;

use super::{Location, Source};

/// Wide glyph used under East-Asian-wide characters so the caret lines up.
const WIDE_DOT: char = '\u{FF0E}';

/// An error message bound to a location, optionally with a pointed snippet.
///
/// Display format: `message (line:column)` followed by the snippet, for
/// example:
///
/// ```text
/// unexpected token Operator(")") (1:5)
///  | a + )
///  | ....^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub message: String,
    pub location: Location,
    pub snippet: String,
}

impl Located {
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
            snippet: String::new(),
        }
    }

    /// Attaches the source line and a caret under `location.column`.
    pub fn bind(mut self, source: &Source) -> Self {
        let Some(line) = source.snippet(self.location.line) else {
            return self;
        };
        let line = line.replace('\t', " ");
        let mut indicator = String::new();
        for c in line.chars().take(self.location.column) {
            indicator.push(if is_wide(c) { WIDE_DOT } else { '.' });
        }
        indicator.push('^');
        self.snippet = format!("\n | {}\n | {}", line, indicator);
        self
    }
}

impl fmt::Display for Located {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}){}", self.message, self.location, self.snippet)
    }
}

impl std::error::Error for Located {}

/// East-Asian-wide and fullwidth code points.
pub(crate) fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1F64F
        | 0x1F900..=0x1F9FF
        | 0x20000..=0x2FFFD
        | 0x30000..=0x3FFFD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_snippet() {
        let source = Source::new("a + )");
        let err = Located::new("unexpected token", Location::new(1, 4)).bind(&source);
        assert_eq!(err.to_string(), "unexpected token (1:5)\n | a + )\n | ....^");
    }

    #[test]
    fn test_wide_characters_use_wide_dots() {
        let source = Source::new("'日本' + 1");
        let err = Located::new("oops", Location::new(1, 5)).bind(&source);
        assert_eq!(err.snippet, "\n | '日本' + 1\n | .\u{FF0E}\u{FF0E}..^");
    }

    #[test]
    fn test_unbound_has_no_snippet() {
        let err = Located::new("boom", Location::new(3, 0));
        assert_eq!(err.to_string(), "boom (3:1)");
    }
}
