//! `in` over literal collections.

use std::sync::Arc;

use super::{Pass, literal_range};
use crate::analyzer::Nature;
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, UnaryOp};
use crate::values::{ConstSet, Value};
use crate::visitor::Visitor;

/// `x in [1, 2, 3]` looks `x` up in a hash set.
///
/// Integer sets are only used when `x` is known to be an integer, so that
/// a float needle keeps comparing by value. String sets need no such
/// care: no other kind equals a string.
#[derive(Default)]
pub(super) struct InArray {
    applied: bool,
}

fn literal_items(ast: &Ast, id: NodeId) -> Option<Vec<Value>> {
    match ast.kind(id) {
        NodeKind::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| match ast.kind(*item) {
                NodeKind::Integer(v) => Some(Value::Int(*v)),
                NodeKind::String(s) => Some(Value::String(s.clone())),
                _ => None,
            })
            .collect(),
        NodeKind::Constant(Value::Array(items)) if !items.is_empty() => Some(items.to_vec()),
        _ => None,
    }
}

fn const_set(items: &[Value], integer_needle: bool) -> Option<ConstSet> {
    if integer_needle && items.iter().all(|v| matches!(v, Value::Int(_))) {
        return Some(ConstSet {
            ints: items.iter().filter_map(Value::as_i64).collect(),
            strings: Default::default(),
        });
    }
    if items.iter().all(|v| matches!(v, Value::String(_))) {
        return Some(ConstSet {
            ints: Default::default(),
            strings: items
                .iter()
                .filter_map(|v| v.as_str().map(Into::into))
                .collect(),
        });
    }
    None
}

impl Visitor for InArray {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Binary {
            op: BinaryOp::In | BinaryOp::NotIn,
            left,
            right,
        } = *ast.kind(id)
        else {
            return;
        };
        let Some(items) = literal_items(ast, right) else {
            return;
        };
        let integer_needle = ast.nature(left).is_some_and(Nature::is_integer);
        if let Some(set) = const_set(&items, integer_needle) {
            self.applied = true;
            ast.replace(right, NodeKind::Constant(Value::Set(Arc::new(set))));
        }
    }
}

impl Pass for InArray {
    const NAME: &'static str = "in_array";

    fn applied(&self) -> bool {
        self.applied
    }
}

/// `x in m..n` with literal bounds becomes `x >= m && x <= n`, without
/// materializing the range.
#[derive(Default)]
pub(super) struct InRange {
    applied: bool,
}

impl Visitor for InRange {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Binary { op, left, right } = *ast.kind(id) else {
            return;
        };
        if !matches!(op, BinaryOp::In | BinaryOp::NotIn)
            || !ast.nature(left).is_some_and(Nature::is_integer)
        {
            return;
        }
        let Some((from, to)) = literal_range(ast, right) else {
            return;
        };
        let from = ast.push_like(NodeKind::Integer(from), right);
        let to = ast.push_like(NodeKind::Integer(to), right);
        ast.set_nature(from, Nature::int());
        ast.set_nature(to, Nature::int());
        let lower = ast.push_like(NodeKind::binary(BinaryOp::MoreOrEqual, left, from), id);
        let upper = ast.push_like(NodeKind::binary(BinaryOp::LessOrEqual, left, to), id);
        ast.set_nature(lower, Nature::bool());
        ast.set_nature(upper, Nature::bool());
        let within = NodeKind::binary(BinaryOp::And, lower, upper);
        if op == BinaryOp::In {
            ast.replace(id, within);
        } else {
            let within = ast.push_like(within, id);
            ast.set_nature(within, Nature::bool());
            ast.replace(
                id,
                NodeKind::Unary {
                    op: UnaryOp::Not,
                    operand: within,
                },
            );
        }
        self.applied = true;
    }
}

impl Pass for InRange {
    const NAME: &'static str = "in_range";

    fn applied(&self) -> bool {
        self.applied
    }
}
