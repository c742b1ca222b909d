//! Pratt parser from tokens to an [`Ast`].

use ecow::EcoString;
use tracing::debug;

use super::error::{ParseError, ParseErrorKind};
use super::lexer::{lex, parse_float, parse_integer, parse_magnitude};
use super::operator::{
    Associativity, PIPE_PRECEDENCE, TERNARY_PRECEDENCE, UNARY_PRECEDENCE, binary_operator,
    unary_operator,
};
use super::token::{Token, TokenKind};
use crate::ast::{Ast, NodeId, NodeKind, PointerKind, UnaryOp};
use crate::diagnostics::Span;
use crate::diagnostics::context::Context;

pub const DEFAULT_MAX_DEPTH: usize = 500;

/// Builtins whose second argument is a predicate evaluated per element.
pub const PREDICATE_BUILTINS: &[&str] = &[
    "all",
    "none",
    "any",
    "one",
    "filter",
    "map",
    "count",
    "sum",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "groupBy",
    "sortBy",
    "reduce",
];

/// Operators that may follow `not` as in `a not matches b`.
const NEGATABLE: &[&str] = &["matches", "contains", "startsWith", "endsWith"];

pub fn parse(source: &str) -> Result<Ast, ParseError> {
    parse_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

pub fn parse_with_max_depth(source: &str, max_depth: usize) -> Result<Ast, ParseError> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        ast: Ast::new(),
        depth: 0,
        max_depth,
        predicates: Vec::new(),
    };
    let root = parser.parse_expression(0)?;
    let current = parser.current().clone();
    if current.kind != TokenKind::Eof {
        return Err(parser.unexpected(&current, None));
    }
    parser.ast.set_root(root);
    debug!(nodes = parser.ast.len(), "parsed expression");
    Ok(parser.ast)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    depth: usize,
    max_depth: usize,
    /// Names of the builtins whose predicates enclose the current position.
    predicates: Vec<EcoString>,
}

impl Parser {
    fn current(&self) -> &Token {
        // `lex` always terminates the stream with `Eof`
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, token: &Token, expected: Option<&str>) -> ParseError {
        let kind = match token.kind {
            TokenKind::Eof => ParseErrorKind::UnexpectedEof,
            _ => ParseErrorKind::UnexpectedToken {
                found: token.to_string(),
                expected: expected.map(String::from),
            },
        };
        ParseError::new(kind, token.span.clone())
    }

    fn expect_bracket(&mut self, bracket: &str) -> Result<Token, ParseError> {
        if self.current().is_bracket(bracket) {
            return Ok(self.advance());
        }
        let token = self.current().clone();
        if bracket == ")" && token.kind != TokenKind::Eof {
            return Err(ParseError::new(
                ParseErrorKind::UnclosedParen {
                    found: token.to_string(),
                },
                token.span,
            ));
        }
        Err(self.unexpected(&token, Some(bracket)))
    }

    fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.ast.push(kind, span)
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.ast.span(id).clone()
    }

    fn parse_expression(&mut self, min_precedence: u16) -> Result<NodeId, ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::new(
                ParseErrorKind::MaxDepthExceeded {
                    max_depth: self.max_depth,
                },
                self.current().span.clone(),
            ));
        }
        let result = self.parse_expression_inner(min_precedence);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, min_precedence: u16) -> Result<NodeId, ParseError> {
        if min_precedence == 0
            && self.current().is(TokenKind::Identifier, "let")
            && self.peek(1).kind == TokenKind::Identifier
        {
            return self.parse_let();
        }

        let mut left = self.parse_unary()?;

        loop {
            let token = self.current().clone();
            if token.kind != TokenKind::Operator {
                break;
            }
            match token.value.as_str() {
                "|" if PIPE_PRECEDENCE >= min_precedence => {
                    self.advance();
                    left = self.parse_pipe(left)?;
                }
                "?" if TERNARY_PRECEDENCE >= min_precedence => {
                    self.advance();
                    left = self.parse_conditional(left)?;
                }
                "not" if NEGATABLE.contains(&self.peek(1).value.as_str())
                    && self.peek(1).kind == TokenKind::Operator =>
                {
                    let Some(info) = binary_operator(&self.peek(1).value) else {
                        break;
                    };
                    if info.precedence < min_precedence {
                        break;
                    }
                    self.advance();
                    let operator = Span::combine(&token.span, &self.advance().span);
                    let right = self.parse_expression(info.precedence + 1)?;
                    let span = Span::combine(&self.span_of(left), &self.span_of(right));
                    let inner = self.ast.push_binary(
                        NodeKind::binary(info.op, left, right),
                        span.clone(),
                        operator,
                    );
                    left = self.push(
                        NodeKind::Unary {
                            op: UnaryOp::Not,
                            operand: inner,
                        },
                        span,
                    );
                }
                lexeme => {
                    let Some(info) = binary_operator(lexeme) else {
                        break;
                    };
                    if info.precedence < min_precedence {
                        break;
                    }
                    self.advance();
                    let next = match info.associativity {
                        Associativity::Left => info.precedence + 1,
                        Associativity::Right => info.precedence,
                    };
                    let right = self.parse_expression(next)?;
                    let span = Span::combine(&self.span_of(left), &self.span_of(right));
                    left = self.ast.push_binary(
                        NodeKind::binary(info.op, left, right),
                        span,
                        token.span.clone(),
                    );
                }
            }
        }
        Ok(left)
    }

    fn parse_let(&mut self) -> Result<NodeId, ParseError> {
        let start = self.advance().span;
        let name = self.advance().value;
        let eq = self.current().clone();
        if !eq.is_operator("=") {
            return Err(self.unexpected(&eq, Some("=")));
        }
        self.advance();
        let value = self.parse_expression(0)?;
        let semi = self.current().clone();
        if !semi.is_operator(";") {
            return Err(self.unexpected(&semi, Some(";")));
        }
        self.advance();
        let body = self.parse_expression(0)?;
        let span = Span::combine(&start, &self.span_of(body));
        Ok(self.push(NodeKind::VariableDeclarator { name, value, body }, span))
    }

    fn parse_conditional(&mut self, cond: NodeId) -> Result<NodeId, ParseError> {
        let then = if self.current().is_operator(":") {
            self.advance();
            None
        } else {
            let then = self.parse_expression(0)?;
            let colon = self.current().clone();
            if !colon.is_operator(":") {
                return Err(self.unexpected(&colon, Some(":")));
            }
            self.advance();
            Some(then)
        };
        let otherwise = self.parse_expression(0)?;
        let span = Span::combine(&self.span_of(cond), &self.span_of(otherwise));
        Ok(self.push(
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            },
            span,
        ))
    }

    /// `left | f(args)` becomes `f(left, args)`.
    fn parse_pipe(&mut self, left: NodeId) -> Result<NodeId, ParseError> {
        let name = self.current().clone();
        if name.kind != TokenKind::Identifier {
            return Err(self.unexpected(&name, Some("function name")));
        }
        self.advance();
        if PREDICATE_BUILTINS.contains(&name.value.as_str()) {
            return self.parse_builtin(&name, Some(left));
        }
        let callee = self.push(NodeKind::identifier(name.value.clone()), name.span.clone());
        let mut args = vec![left];
        let mut end = name.span.clone();
        if self.current().is_bracket("(") {
            self.advance();
            let (rest, close) = self.parse_list(")")?;
            args.extend(rest);
            end = close;
        }
        let span = Span::combine(&self.span_of(left), &end);
        Ok(self.push(
            NodeKind::Call {
                callee,
                args,
                fast: false,
                typed: None,
            },
            span,
        ))
    }

    fn parse_unary(&mut self) -> Result<NodeId, ParseError> {
        let token = self.current().clone();
        if token.kind == TokenKind::Operator
            && let Some(op) = unary_operator(&token.value)
        {
            self.advance();
            let next = self.current().clone();
            if op == UnaryOp::Negate
                && next.kind == TokenKind::Integer
                && parse_magnitude(&next.value) == Some(i64::MIN.unsigned_abs())
            {
                self.advance();
                let span = Span::combine(&token.span, &next.span);
                return Ok(self.push(NodeKind::Integer(i64::MIN), span));
            }
            let operand = self.parse_expression(UNARY_PRECEDENCE)?;
            let span = Span::combine(&token.span, &self.span_of(operand));
            return Ok(self.push(NodeKind::Unary { op, operand }, span));
        }
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> Result<NodeId, ParseError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = parse_integer(&token.value).ok_or_else(|| {
                    ParseError::new(
                        ParseErrorKind::BadNumber {
                            text: token.value.to_string(),
                        },
                        token.span.clone(),
                    )
                })?;
                Ok(self.push(NodeKind::Integer(value), token.span))
            }
            TokenKind::Float => {
                self.advance();
                let value = parse_float(&token.value).ok_or_else(|| {
                    ParseError::new(
                        ParseErrorKind::BadNumber {
                            text: token.value.to_string(),
                        },
                        token.span.clone(),
                    )
                })?;
                Ok(self.push(NodeKind::Float(value), token.span))
            }
            TokenKind::String => {
                self.advance();
                Ok(self.push(NodeKind::String(token.value), token.span))
            }
            TokenKind::Pointer => {
                self.advance();
                self.parse_pointer(&token)
            }
            TokenKind::Identifier => {
                self.advance();
                self.parse_identifier(token)
            }
            TokenKind::Bracket if token.value == "(" => {
                self.advance();
                let inner = self.parse_expression(0)?;
                self.expect_bracket(")")?;
                Ok(inner)
            }
            TokenKind::Bracket if token.value == "[" => {
                self.advance();
                let (items, close) = self.parse_list("]")?;
                Ok(self.push(NodeKind::Array(items), Span::combine(&token.span, &close)))
            }
            TokenKind::Bracket if token.value == "{" => {
                self.advance();
                self.parse_map(token.span)
            }
            TokenKind::Operator if token.value == "." && !self.predicates.is_empty() => {
                // `.name` inside a predicate is `#.name`
                self.advance();
                let name = self.current().clone();
                if !is_name_token(&name) {
                    return Err(self.unexpected(&name, Some("field name")));
                }
                self.advance();
                let element = self.push(NodeKind::Pointer(PointerKind::Element), token.span.clone());
                let property = self.push(NodeKind::String(name.value), name.span.clone());
                Ok(self.push(
                    NodeKind::Member {
                        object: element,
                        property,
                        optional: false,
                        field: None,
                        method: None,
                    },
                    Span::combine(&token.span, &name.span),
                ))
            }
            _ => Err(self.unexpected(&token, None)),
        }
    }

    fn parse_pointer(&mut self, token: &Token) -> Result<NodeId, ParseError> {
        let invalid = |message: String| {
            ParseError::new(ParseErrorKind::InvalidPointer { message }, token.span.clone())
        };
        let Some(innermost) = self.predicates.last() else {
            return Err(invalid(
                "cannot use pointer accessor outside predicate".to_string(),
            ));
        };
        let kind = match token.value.as_str() {
            "" => PointerKind::Element,
            "index" => PointerKind::Index,
            "acc" if innermost.as_str() == "reduce" => PointerKind::Acc,
            "acc" => {
                return Err(invalid(format!(
                    "cannot use #acc outside reduce (inside {})",
                    innermost
                )));
            }
            other => return Err(invalid(format!("unknown pointer #{}", other))),
        };
        Ok(self.push(NodeKind::Pointer(kind), token.span.clone()))
    }

    fn parse_identifier(&mut self, token: Token) -> Result<NodeId, ParseError> {
        match token.value.as_str() {
            "true" => return Ok(self.push(NodeKind::Bool(true), token.span)),
            "false" => return Ok(self.push(NodeKind::Bool(false), token.span)),
            "nil" => return Ok(self.push(NodeKind::Nil, token.span)),
            _ => {}
        }
        if self.current().is_bracket("(") && PREDICATE_BUILTINS.contains(&token.value.as_str()) {
            return self.parse_builtin(&token, None);
        }
        Ok(self.push(NodeKind::identifier(token.value), token.span))
    }

    /// Parses the parenthesized arguments of a predicate builtin. `piped`
    /// is the first argument when the call is the right side of `|`.
    fn parse_builtin(&mut self, name: &Token, piped: Option<NodeId>) -> Result<NodeId, ParseError> {
        let mut args = Vec::new();
        let mut end = name.span.clone();
        if let Some(first) = piped {
            args.push(first);
        }
        if self.current().is_bracket("(") {
            self.advance();
            if piped.is_none() {
                args.push(self.parse_expression(0)?);
                if self.current().is_operator(",") {
                    self.advance();
                } else if !self.current().is_bracket(")") {
                    let found = self.current().clone();
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedComma {
                            found: found.to_string(),
                        },
                        found.span,
                    ));
                }
            }
            let mut index = args.len();
            while !self.current().is_bracket(")") {
                let arg = if index == 1 {
                    self.parse_predicate(name)?
                } else {
                    self.parse_expression(0)?
                };
                args.push(arg);
                index += 1;
                if self.current().is_operator(",") {
                    self.advance();
                } else if !self.current().is_bracket(")") {
                    let found = self.current().clone();
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedComma {
                            found: found.to_string(),
                        },
                        found.span,
                    ));
                }
            }
            end = self.expect_bracket(")")?.span;
        }
        let span = Span::combine(&name.span, &end);
        let span = match piped {
            Some(first) => Span::combine(&self.span_of(first), &span),
            None => span,
        };
        Ok(self.push(NodeKind::builtin(name.value.clone(), args), span))
    }

    fn parse_predicate(&mut self, builtin: &Token) -> Result<NodeId, ParseError> {
        self.predicates.push(builtin.value.clone());
        let start = self.current().span.clone();
        let result = self.parse_predicate_body();
        self.predicates.pop();
        let body = result.map_err(|err| {
            err.with_context(Context::InPredicate {
                builtin: builtin.value.to_string(),
                span: builtin.span.clone(),
            })
        })?;
        let span = Span::combine(&start, &self.span_of(body));
        Ok(self.push(NodeKind::Predicate { body }, span))
    }

    /// A predicate body, optionally wrapped in braces.
    fn parse_predicate_body(&mut self) -> Result<NodeId, ParseError> {
        if !self.current().is_bracket("{") {
            return self.parse_expression(0);
        }
        self.advance();
        let body = self.parse_expression(0)?;
        self.expect_bracket("}")?;
        Ok(body)
    }

    /// Parses comma-separated expressions up to `close`, allowing a
    /// trailing comma. Returns the items and the closing bracket span.
    fn parse_list(&mut self, close: &str) -> Result<(Vec<NodeId>, Span), ParseError> {
        let mut items = Vec::new();
        while !self.current().is_bracket(close) {
            items.push(self.parse_expression(0)?);
            if self.current().is_operator(",") {
                self.advance();
            } else if !self.current().is_bracket(close) {
                let found = self.current().clone();
                if found.kind == TokenKind::Eof {
                    return Err(self.unexpected(&found, Some(close)));
                }
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedComma {
                        found: found.to_string(),
                    },
                    found.span,
                ));
            }
        }
        let close = self.advance().span;
        Ok((items, close))
    }

    fn parse_map(&mut self, open: Span) -> Result<NodeId, ParseError> {
        let mut pairs = Vec::new();
        while !self.current().is_bracket("}") {
            let token = self.current().clone();
            let key = match token.kind {
                TokenKind::Identifier | TokenKind::String | TokenKind::Integer | TokenKind::Float => {
                    self.advance();
                    self.push(NodeKind::String(token.value.clone()), token.span.clone())
                }
                TokenKind::Operator if is_name_token(&token) => {
                    self.advance();
                    self.push(NodeKind::String(token.value.clone()), token.span.clone())
                }
                TokenKind::Bracket if token.value == "(" => {
                    self.advance();
                    let key = self.parse_expression(0)?;
                    self.expect_bracket(")")?;
                    key
                }
                _ => return Err(self.unexpected(&token, Some("map key"))),
            };
            let colon = self.current().clone();
            if !colon.is_operator(":") {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedColon {
                        found: colon.to_string(),
                    },
                    colon.span,
                ));
            }
            self.advance();
            let value = self.parse_expression(0)?;
            let span = Span::combine(&self.span_of(key), &self.span_of(value));
            pairs.push(self.push(NodeKind::Pair { key, value }, span));
            if self.current().is_operator(",") {
                self.advance();
            } else if !self.current().is_bracket("}") {
                let found = self.current().clone();
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedComma {
                        found: found.to_string(),
                    },
                    found.span,
                ));
            }
        }
        let close = self.advance().span;
        Ok(self.push(NodeKind::Map(pairs), Span::combine(&open, &close)))
    }

    fn parse_postfix(&mut self, mut node: NodeId) -> Result<NodeId, ParseError> {
        let mut chained = false;
        loop {
            let token = self.current().clone();
            match (token.kind, token.value.as_str()) {
                (TokenKind::Operator, "." | "?.") => {
                    let optional = token.value == "?.";
                    chained |= optional;
                    self.advance();
                    if optional && self.current().is_bracket("[") {
                        self.advance();
                        let property = self.parse_expression(0)?;
                        let close = self.expect_bracket("]")?.span;
                        node = self.member(node, property, true, close);
                        continue;
                    }
                    let name = self.current().clone();
                    if !is_name_token(&name) {
                        return Err(self.unexpected(&name, Some("field name")));
                    }
                    self.advance();
                    let property = self.push(NodeKind::String(name.value), name.span.clone());
                    node = self.member(node, property, optional, name.span);
                }
                (TokenKind::Bracket, "[") => {
                    self.advance();
                    node = self.parse_index(node)?;
                }
                (TokenKind::Bracket, "(") => {
                    self.advance();
                    let (args, close) = self.parse_list(")")?;
                    let span = Span::combine(&self.span_of(node), &close);
                    node = self.push(
                        NodeKind::Call {
                            callee: node,
                            args,
                            fast: false,
                            typed: None,
                        },
                        span,
                    );
                }
                _ => break,
            }
        }
        if chained {
            let span = self.span_of(node);
            node = self.push(NodeKind::Chain { inner: node }, span);
        }
        Ok(node)
    }

    fn member(&mut self, object: NodeId, property: NodeId, optional: bool, end: Span) -> NodeId {
        let span = Span::combine(&self.span_of(object), &end);
        self.push(
            NodeKind::Member {
                object,
                property,
                optional,
                field: None,
                method: None,
            },
            span,
        )
    }

    /// After `[`: an index `a[i]` or a slice `a[from:to]`.
    fn parse_index(&mut self, array: NodeId) -> Result<NodeId, ParseError> {
        if self.current().is_operator(":") {
            return self.parse_slice(array, None);
        }
        let from = self.parse_expression(0)?;
        if self.current().is_operator(":") {
            return self.parse_slice(array, Some(from));
        }
        let close = self.expect_bracket("]")?.span;
        Ok(self.member(array, from, false, close))
    }

    fn parse_slice(&mut self, array: NodeId, from: Option<NodeId>) -> Result<NodeId, ParseError> {
        self.advance();
        let to = if self.current().is_bracket("]") {
            None
        } else {
            Some(self.parse_expression(0)?)
        };
        let close = self.expect_bracket("]")?.span;
        let span = Span::combine(&self.span_of(array), &close);
        Ok(self.push(NodeKind::Slice { array, from, to }, span))
    }
}

/// Identifiers and word operators can both name a field.
fn is_name_token(token: &Token) -> bool {
    match token.kind {
        TokenKind::Identifier => true,
        TokenKind::Operator => token
            .value
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic())
            && !token.value.contains(' '),
        _ => false,
    }
}
