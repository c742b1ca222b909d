//! Tolerant scanner for the REPL. Unlike the engine's lexer it never fails
//! on half-typed input, so it can color every keystroke and decide whether
//! Enter should submit or continue the line.

use logos::Logos;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[regex(r"//.*")]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,

    #[regex(r#""(?:[^"\\]|\\.)*""#)]
    #[regex(r#"'(?:[^'\\]|\\.)*'"#)]
    #[regex(r"`[^`]*`")]
    String,

    #[regex(r"[0-9][0-9a-zA-Z_]*(\.[0-9][0-9_]*)?([eE][+-]?[0-9]+)?")]
    Number,

    #[token("true")]
    #[token("false")]
    #[token("nil")]
    Constant,

    #[token("let")]
    #[token("and")]
    #[token("or")]
    #[token("not")]
    #[token("in")]
    #[token("matches")]
    #[token("contains")]
    #[token("startsWith")]
    #[token("endsWith")]
    Keyword,

    #[regex(r"#[A-Za-z]*")]
    Pointer,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Identifier,

    #[regex(r"[-+*/%^<>=!?:.,;|&]")]
    Operator,
}

/// Nesting depth left open at the end of `buffer`, or `None` when the
/// scanner hits something it cannot match (an unterminated string).
pub fn calculate_depth(buffer: &str) -> Option<usize> {
    let mut depth: isize = 0;

    for token in Token::lexer(buffer) {
        match token {
            Ok(Token::LBrace | Token::LBracket | Token::LParen) => depth += 1,
            Ok(Token::RBrace | Token::RBracket | Token::RParen) => depth -= 1,
            Ok(_) => {}
            Err(_) => return None,
        }
    }

    Some(depth.max(0) as usize)
}

/// True when `buffer` should continue on the next line: a bracket is still
/// open or a raw string runs past the end.
pub fn is_incomplete(buffer: &str) -> bool {
    match calculate_depth(buffer) {
        Some(depth) => depth > 0,
        None => buffer.matches('`').count() % 2 == 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth() {
        assert_eq!(calculate_depth("map(xs, {a: [1"), Some(3));
        assert_eq!(calculate_depth("f(1))"), Some(0));
        assert_eq!(calculate_depth("'(' + \"[\""), Some(0));
        assert_eq!(calculate_depth("// (\n1"), Some(0));
        assert_eq!(calculate_depth("'open"), None);
    }

    #[test]
    fn test_incomplete_input() {
        assert!(is_incomplete("filter(xs,"));
        assert!(is_incomplete("`multi\nline"));
        assert!(!is_incomplete("`done`"));
        assert!(!is_incomplete("'broken"));
        assert!(!is_incomplete("1 + 2"));
    }

    #[test]
    fn test_keywords_beat_identifiers() {
        let tokens: Vec<_> = Token::lexer("nil in names").filter_map(Result::ok).collect();
        assert_eq!(tokens, vec![Token::Constant, Token::Keyword, Token::Identifier]);
    }
}
