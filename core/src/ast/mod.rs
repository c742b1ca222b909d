//! Expression tree.
//!
//! Nodes live in a single arena ([`Ast`]) and refer to their children by
//! [`NodeId`]. Spans, operator token spans and checked natures are kept in
//! parallel vectors, so rewriting a node in place is a matter of replacing
//! its [`NodeKind`].

mod print;

use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use regex::Regex;
use smallvec::SmallVec;

use crate::analyzer::Nature;
use crate::diagnostics::Span;
use crate::types::FieldPath;
use crate::values::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    More,
    LessOrEqual,
    MoreOrEqual,
    In,
    NotIn,
    Matches,
    Contains,
    StartsWith,
    EndsWith,
    Range,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Exponent,
    Coalesce,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::More => ">",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::MoreOrEqual => ">=",
            BinaryOp::In => "in",
            BinaryOp::NotIn => "not in",
            BinaryOp::Matches => "matches",
            BinaryOp::Contains => "contains",
            BinaryOp::StartsWith => "startsWith",
            BinaryOp::EndsWith => "endsWith",
            BinaryOp::Range => "..",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Exponent => "**",
            BinaryOp::Coalesce => "??",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Less | BinaryOp::More | BinaryOp::LessOrEqual | BinaryOp::MoreOrEqual
        )
    }
}

/// Which iteration value a `#` pointer refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    /// `#`, the current element.
    Element,
    /// `#index`
    Index,
    /// `#acc`, the `reduce` accumulator.
    Acc,
}

impl PointerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PointerKind::Element => "#",
            PointerKind::Index => "#index",
            PointerKind::Acc => "#acc",
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Nil,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(EcoString),
    /// Produced by the optimizer and by patchers.
    Constant(Value),
    Identifier {
        name: EcoString,
        /// Field path into a struct environment, set by the checker.
        field: Option<FieldPath>,
        /// Method slot of a struct environment, set by the checker.
        method: Option<u16>,
        deref: bool,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    /// `left matches right` with the pattern precompiled when `right` is
    /// a literal.
    Matches {
        left: NodeId,
        right: NodeId,
        regex: Option<Arc<Regex>>,
    },
    /// Extent of an optional chain.
    Chain {
        inner: NodeId,
    },
    /// `object.name`, `object[expr]` and their `?.` forms. A name access
    /// has a `String` property.
    Member {
        object: NodeId,
        property: NodeId,
        optional: bool,
        field: Option<FieldPath>,
        method: Option<u16>,
    },
    Slice {
        array: NodeId,
        from: Option<NodeId>,
        to: Option<NodeId>,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
        fast: bool,
        typed: Option<u16>,
    },
    Builtin {
        name: EcoString,
        args: Vec<NodeId>,
        /// Fused mapping predicate of a `filter`.
        map: Option<NodeId>,
        /// Early exit count of a `count` loop.
        threshold: Option<i64>,
    },
    Predicate {
        body: NodeId,
    },
    Pointer(PointerKind),
    /// `cond ? then : otherwise`; `then` is `None` for `cond ?: otherwise`.
    Conditional {
        cond: NodeId,
        then: Option<NodeId>,
        otherwise: NodeId,
    },
    Array(Vec<NodeId>),
    Map(Vec<NodeId>),
    Pair {
        key: NodeId,
        value: NodeId,
    },
    VariableDeclarator {
        name: EcoString,
        value: NodeId,
        body: NodeId,
    },
}

impl NodeKind {
    pub fn identifier(name: impl Into<EcoString>) -> Self {
        NodeKind::Identifier {
            name: name.into(),
            field: None,
            method: None,
            deref: false,
        }
    }

    pub fn binary(op: BinaryOp, left: NodeId, right: NodeId) -> Self {
        NodeKind::Binary { op, left, right }
    }

    pub fn builtin(name: impl Into<EcoString>, args: Vec<NodeId>) -> Self {
        NodeKind::Builtin {
            name: name.into(),
            args,
            map: None,
            threshold: None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::Nil
                | NodeKind::Bool(_)
                | NodeKind::Integer(_)
                | NodeKind::Float(_)
                | NodeKind::String(_)
                | NodeKind::Constant(_)
        )
    }
}

/// Arena of expression nodes.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    kinds: Vec<NodeKind>,
    spans: Vec<Span>,
    /// Operator token of binary nodes.
    operators: Vec<Option<Span>>,
    natures: Vec<Option<Nature>>,
    root: NodeId,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        self.spans.push(span);
        self.operators.push(None);
        self.natures.push(None);
        id
    }

    /// Adds a binary node, remembering where its operator token is.
    pub fn push_binary(&mut self, kind: NodeKind, span: Span, operator: Span) -> NodeId {
        let id = self.push(kind, span);
        self.operators[id.index()] = Some(operator);
        id
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.kinds[id.index()]
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.kinds[id.index()]
    }

    pub fn span(&self, id: NodeId) -> &Span {
        &self.spans[id.index()]
    }

    /// Span of the operator token of a binary node, or the node's span when
    /// it has none (nodes built by rewrites).
    pub fn operator_span(&self, id: NodeId) -> &Span {
        self.operators[id.index()]
            .as_ref()
            .unwrap_or(&self.spans[id.index()])
    }

    pub fn nature(&self, id: NodeId) -> Option<&Nature> {
        self.natures[id.index()].as_ref()
    }

    pub fn set_nature(&mut self, id: NodeId, nature: Nature) {
        self.natures[id.index()] = Some(nature);
    }

    /// Replaces a node in place, keeping its span and nature.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) {
        self.kinds[id.index()] = kind;
    }

    /// Replaces `id` with a copy of node `with`, keeping the span of `id`.
    pub fn replace_with_node(&mut self, id: NodeId, with: NodeId) {
        self.kinds[id.index()] = self.kinds[with.index()].clone();
        self.operators[id.index()] = self.operators[with.index()].clone();
        self.natures[id.index()] = self.natures[with.index()].clone();
    }

    /// Adds a node typed like `like` and spanning it.
    pub fn push_like(&mut self, kind: NodeKind, like: NodeId) -> NodeId {
        let id = self.push(kind, self.span(like).clone());
        self.natures[id.index()] = self.natures[like.index()].clone();
        id
    }

    pub fn children(&self, id: NodeId) -> SmallVec<[NodeId; 4]> {
        let mut out = SmallVec::new();
        match self.kind(id) {
            NodeKind::Nil
            | NodeKind::Bool(_)
            | NodeKind::Integer(_)
            | NodeKind::Float(_)
            | NodeKind::String(_)
            | NodeKind::Constant(_)
            | NodeKind::Identifier { .. }
            | NodeKind::Pointer(_) => {}
            NodeKind::Unary { operand, .. } => out.push(*operand),
            NodeKind::Binary { left, right, .. } | NodeKind::Matches { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            NodeKind::Chain { inner } => out.push(*inner),
            NodeKind::Member {
                object, property, ..
            } => {
                out.push(*object);
                out.push(*property);
            }
            NodeKind::Slice { array, from, to } => {
                out.push(*array);
                out.extend(*from);
                out.extend(*to);
            }
            NodeKind::Call { callee, args, .. } => {
                out.extend(args.iter().copied());
                out.push(*callee);
            }
            NodeKind::Builtin { args, map, .. } => {
                out.extend(args.iter().copied());
                out.extend(*map);
            }
            NodeKind::Predicate { body } => out.push(*body),
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                out.push(*cond);
                out.extend(*then);
                out.push(*otherwise);
            }
            NodeKind::Array(items) | NodeKind::Map(items) => out.extend(items.iter().copied()),
            NodeKind::Pair { key, value } => {
                out.push(*key);
                out.push(*value);
            }
            NodeKind::VariableDeclarator { value, body, .. } => {
                out.push(*value);
                out.push(*body);
            }
        }
        out
    }

    /// Whether any node under `id` satisfies `pred`.
    pub fn any(&self, id: NodeId, pred: &dyn Fn(&NodeKind) -> bool) -> bool {
        pred(self.kind(id)) || self.children(id).into_iter().any(|c| self.any(c, pred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_children_in_evaluation_order() {
        let mut ast = Ast::new();
        let a = ast.push(NodeKind::identifier("a"), Span::new(0, 1));
        let b = ast.push(NodeKind::Integer(1), Span::new(4, 5));
        let add = ast.push(NodeKind::binary(BinaryOp::Add, a, b), Span::new(0, 5));
        assert_eq!(ast.children(add).as_slice(), &[a, b]);
        assert_eq!(ast.len(), 3);
    }

    #[test]
    fn test_replace_keeps_span() {
        let mut ast = Ast::new();
        let a = ast.push(NodeKind::Integer(1), Span::new(3, 4));
        ast.replace(a, NodeKind::Integer(2));
        assert!(matches!(ast.kind(a), NodeKind::Integer(2)));
        assert_eq!(ast.span(a), &Span::new(3, 4));
    }

    #[test]
    fn test_any_searches_subtree() {
        let mut ast = Ast::new();
        let p = ast.push(NodeKind::Pointer(PointerKind::Index), Span::default());
        let one = ast.push(NodeKind::Integer(1), Span::default());
        let add = ast.push(NodeKind::binary(BinaryOp::Add, p, one), Span::default());
        assert!(ast.any(add, &|k| matches!(k, NodeKind::Pointer(PointerKind::Index))));
        assert!(!ast.any(one, &|k| matches!(k, NodeKind::Pointer(_))));
    }
}
