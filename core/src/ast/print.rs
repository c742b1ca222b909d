//! Canonical source rendering.
//!
//! The output re-parses to an equivalent tree. Parentheses are emitted only
//! where precedence or associativity requires them.

use core::fmt::Write;

use super::{Ast, NodeId, NodeKind};
use crate::parser::operator::{Associativity, TERNARY_PRECEDENCE, UNARY_PRECEDENCE, binding};
use crate::values::Value;

const ATOM: u16 = 1000;

impl Ast {
    /// Renders the subtree rooted at `id` as source text.
    pub fn print(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(&mut out, id);
        out
    }

    fn precedence(&self, id: NodeId) -> u16 {
        match self.kind(id) {
            NodeKind::Binary { op, .. } => binding(*op).0,
            NodeKind::Matches { .. } => 70,
            NodeKind::Unary { .. } => UNARY_PRECEDENCE,
            NodeKind::Conditional { .. } => TERNARY_PRECEDENCE,
            NodeKind::VariableDeclarator { .. } => 0,
            NodeKind::Chain { inner } => self.precedence(*inner),
            NodeKind::Integer(v) if *v < 0 => UNARY_PRECEDENCE,
            NodeKind::Float(v) if *v < 0.0 => UNARY_PRECEDENCE,
            _ => ATOM,
        }
    }

    fn write_wrapped(&self, out: &mut String, id: NodeId, wrap: bool) {
        if wrap {
            out.push('(');
            self.write_node(out, id);
            out.push(')');
        } else {
            self.write_node(out, id);
        }
    }

    fn write_binary(
        &self,
        out: &mut String,
        op: &str,
        (prec, assoc): (u16, Associativity),
        left: NodeId,
        right: NodeId,
    ) {
        let lp = self.precedence(left);
        let rp = self.precedence(right);
        self.write_wrapped(out, left, lp < prec || (lp == prec && assoc == Associativity::Right));
        if op == ".." {
            out.push_str(op);
        } else {
            let _ = write!(out, " {} ", op);
        }
        self.write_wrapped(out, right, rp < prec || (rp == prec && assoc == Associativity::Left));
    }

    fn write_list(&self, out: &mut String, items: &[NodeId]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_node(out, *item);
        }
    }

    fn write_node(&self, out: &mut String, id: NodeId) {
        match self.kind(id) {
            NodeKind::Nil => out.push_str("nil"),
            NodeKind::Bool(b) => {
                let _ = write!(out, "{}", b);
            }
            NodeKind::Integer(v) => {
                let _ = write!(out, "{}", v);
            }
            NodeKind::Float(v) => {
                let _ = write!(out, "{}", Value::Float64(*v));
            }
            NodeKind::String(s) => {
                let _ = write!(out, "{}", Value::String(s.clone()));
            }
            NodeKind::Constant(value) => {
                let _ = write!(out, "{}", value);
            }
            NodeKind::Identifier { name, .. } => out.push_str(name),
            NodeKind::Unary { op, operand } => {
                out.push_str(op.as_str());
                let wrap = self.precedence(*operand) < UNARY_PRECEDENCE
                    || matches!(self.kind(*operand), NodeKind::Unary { op: inner, .. } if inner == op);
                self.write_wrapped(out, *operand, wrap);
            }
            NodeKind::Binary { op, left, right } => {
                let (prec, assoc) = binding(*op);
                self.write_binary(out, op.as_str(), (prec, assoc), *left, *right);
            }
            NodeKind::Matches { left, right, .. } => {
                self.write_binary(out, "matches", (70, Associativity::Left), *left, *right);
            }
            NodeKind::Chain { inner } => self.write_node(out, *inner),
            NodeKind::Member {
                object,
                property,
                optional,
                ..
            } => {
                self.write_wrapped(out, *object, self.precedence(*object) < ATOM);
                match self.kind(*property) {
                    NodeKind::String(name) if is_identifier(name) => {
                        out.push_str(if *optional { "?." } else { "." });
                        out.push_str(name);
                    }
                    _ => {
                        out.push_str(if *optional { "?.[" } else { "[" });
                        self.write_node(out, *property);
                        out.push(']');
                    }
                }
            }
            NodeKind::Slice { array, from, to } => {
                self.write_wrapped(out, *array, self.precedence(*array) < ATOM);
                out.push('[');
                if let Some(from) = from {
                    self.write_node(out, *from);
                }
                out.push(':');
                if let Some(to) = to {
                    self.write_node(out, *to);
                }
                out.push(']');
            }
            NodeKind::Call { callee, args, .. } => {
                self.write_wrapped(out, *callee, self.precedence(*callee) < ATOM);
                out.push('(');
                self.write_list(out, args);
                out.push(')');
            }
            NodeKind::Builtin {
                name, args, map, ..
            } => {
                if let Some(map) = map {
                    out.push_str("map(");
                    let _ = write!(out, "{}(", name);
                    self.write_list(out, args);
                    out.push_str("), ");
                    self.write_node(out, *map);
                    out.push(')');
                } else {
                    let _ = write!(out, "{}(", name);
                    self.write_list(out, args);
                    out.push(')');
                }
            }
            NodeKind::Predicate { body } => self.write_node(out, *body),
            NodeKind::Pointer(kind) => out.push_str(kind.as_str()),
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.write_wrapped(out, *cond, self.precedence(*cond) <= TERNARY_PRECEDENCE);
                match then {
                    Some(then) => {
                        out.push_str(" ? ");
                        self.write_node(out, *then);
                        out.push_str(" : ");
                    }
                    None => out.push_str(" ?: "),
                }
                self.write_node(out, *otherwise);
            }
            NodeKind::Array(items) => {
                out.push('[');
                self.write_list(out, items);
                out.push(']');
            }
            NodeKind::Map(pairs) => {
                out.push('{');
                self.write_list(out, pairs);
                out.push('}');
            }
            NodeKind::Pair { key, value } => {
                match self.kind(*key) {
                    NodeKind::String(_) | NodeKind::Integer(_) | NodeKind::Float(_) => {
                        self.write_node(out, *key)
                    }
                    _ => self.write_wrapped(out, *key, true),
                }
                out.push_str(": ");
                self.write_node(out, *value);
            }
            NodeKind::VariableDeclarator { name, value, body } => {
                let _ = write!(out, "let {} = ", name);
                self.write_node(out, *value);
                out.push_str("; ");
                self.write_node(out, *body);
            }
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c == '$' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '$' || c.is_alphanumeric())
        && !matches!(
            name,
            "and" | "or" | "not" | "in" | "matches" | "contains" | "startsWith" | "endsWith"
        )
}
