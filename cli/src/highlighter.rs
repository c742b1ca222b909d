use std::collections::HashSet;

use exprel_core::builtins;
use logos::Logos;
use nu_ansi_term::{Color, Style};
use reedline::StyledText;

use crate::lexer::Token;

const DEFAULT: Color = Color::White;

/// Colors input by token class; identifiers naming a builtin or a
/// declared variable get their own colors.
pub struct Highlighter {
    variables: HashSet<String>,
}

impl Highlighter {
    pub fn new(variables: impl IntoIterator<Item = String>) -> Self {
        Self {
            variables: variables.into_iter().collect(),
        }
    }

    fn color(&self, token: Token, text: &str) -> Color {
        match token {
            Token::Keyword => Color::Magenta,
            Token::Constant | Token::Number => Color::Cyan,
            Token::String => Color::Green,
            Token::Comment => Color::DarkGray,
            Token::Pointer => Color::Yellow,
            Token::Identifier if builtins::lookup(text).is_some() => Color::Blue,
            Token::Identifier if self.variables.contains(text) => Color::Red,
            _ => DEFAULT,
        }
    }
}

impl reedline::Highlighter for Highlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut output = StyledText::new();
        let mut end = 0;

        for (token, span) in Token::lexer(line).spanned() {
            if span.start > end {
                output.push((Style::new().fg(DEFAULT), line[end..span.start].to_string()));
            }
            let text = &line[span.clone()];
            let fg = match token {
                Ok(token) => self.color(token, text),
                Err(_) => DEFAULT,
            };
            output.push((Style::new().fg(fg), text.to_string()));
            end = span.end;
        }
        if end < line.len() {
            output.push((Style::new().fg(DEFAULT), line[end..].to_string()));
        }

        output
    }
}
