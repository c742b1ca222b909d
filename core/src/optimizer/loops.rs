//! Rewrites of loop builtins: fusion, early exits and merged predicates.

use super::{Pass, int_literal, predicate_body, uses_position};
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind};
use crate::visitor::Visitor;

/// Builtin call without a fused map or threshold, split into its parts.
fn plain_builtin<'a>(ast: &'a Ast, id: NodeId, name: &str) -> Option<&'a [NodeId]> {
    match ast.kind(id) {
        NodeKind::Builtin {
            name: found,
            args,
            map: None,
            threshold: None,
        } if found == name => Some(args),
        _ => None,
    }
}

/// `map(filter(xs, p), f)` runs as one loop that maps only the elements
/// that pass `p`. `sum(map(xs, f))` becomes `sum(xs, f)`.
///
/// Neither fires when `f` reads `#index` or `#acc`: inside the fused loop
/// the index would count the unfiltered input.
#[derive(Default)]
pub(super) struct FilterMap {
    applied: bool,
}

impl FilterMap {
    fn map_over_filter(&mut self, ast: &mut Ast, id: NodeId) {
        let Some(&[inner, mapper]) = plain_builtin(ast, id, "map") else {
            return;
        };
        let Some(&[xs, predicate]) = plain_builtin(ast, inner, "filter") else {
            return;
        };
        let Some(body) = predicate_body(ast, mapper) else {
            return;
        };
        if uses_position(ast, body) {
            return;
        }
        self.applied = true;
        ast.replace(
            id,
            NodeKind::Builtin {
                name: "filter".into(),
                args: vec![xs, predicate],
                map: Some(mapper),
                threshold: None,
            },
        );
    }

    fn sum_over_map(&mut self, ast: &mut Ast, id: NodeId) {
        let Some(&[inner]) = plain_builtin(ast, id, "sum") else {
            return;
        };
        let Some(&[xs, mapper]) = plain_builtin(ast, inner, "map") else {
            return;
        };
        match predicate_body(ast, mapper) {
            Some(body) if !uses_position(ast, body) => {}
            _ => return,
        }
        self.applied = true;
        ast.replace(id, NodeKind::builtin("sum", vec![xs, mapper]));
    }
}

impl Visitor for FilterMap {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        self.map_over_filter(ast, id);
        self.sum_over_map(ast, id);
    }
}

impl Pass for FilterMap {
    const NAME: &'static str = "filter_map";

    fn applied(&self) -> bool {
        self.applied
    }
}

/// `count(xs, p) > 0` and `count(xs, p) >= 1` are `any(xs, p)`, which
/// stops at the first match.
#[derive(Default)]
pub(super) struct CountAny {
    applied: bool,
}

impl Visitor for CountAny {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Binary { op, left, right } = *ast.kind(id) else {
            return;
        };
        let at_least_one = matches!(
            (op, int_literal(ast, right)),
            (BinaryOp::More, Some(0)) | (BinaryOp::MoreOrEqual, Some(1))
        );
        if !at_least_one {
            return;
        }
        let Some(args) = count_args(ast, left) else {
            return;
        };
        let args = args.to_vec();
        self.applied = true;
        ast.replace(id, NodeKind::builtin("any", args));
    }
}

impl Pass for CountAny {
    const NAME: &'static str = "count_any";

    fn applied(&self) -> bool {
        self.applied
    }
}

/// `count(xs, p)` with a predicate, ignoring any threshold already set.
fn count_args(ast: &Ast, id: NodeId) -> Option<&[NodeId]> {
    match ast.kind(id) {
        NodeKind::Builtin {
            name,
            args,
            map: None,
            ..
        } if name == "count" && args.len() == 2 => Some(args),
        _ => None,
    }
}

/// Lets `count(xs, p) <op> n` stop counting once the comparison is
/// decided. The comparison itself stays.
#[derive(Default)]
pub(super) struct CountThreshold {
    applied: bool,
}

impl Visitor for CountThreshold {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Binary { op, left, right } = *ast.kind(id) else {
            return;
        };
        if count_args(ast, left).is_none() {
            return;
        }
        let Some(n) = int_literal(ast, right).filter(|n| *n >= 0) else {
            return;
        };
        let wanted = match op {
            BinaryOp::More | BinaryOp::LessOrEqual => n.saturating_add(1),
            BinaryOp::MoreOrEqual | BinaryOp::Less => n,
            _ => return,
        };
        if wanted <= 1 {
            return;
        }
        if let NodeKind::Builtin { threshold, .. } = ast.kind_mut(left)
            && *threshold != Some(wanted)
        {
            *threshold = Some(wanted);
            self.applied = true;
        }
    }
}

impl Pass for CountThreshold {
    const NAME: &'static str = "count_threshold";

    fn applied(&self) -> bool {
        self.applied
    }
}

/// Merges two quantifiers over the same collection into one loop:
/// `all(xs, p) && all(xs, q)` is `all(xs, p && q)`, `any(xs, p) ||
/// any(xs, q)` is `any(xs, p || q)` and `none(xs, p) && none(xs, q)` is
/// `none(xs, p || q)`.
///
/// `one` never merges: exactly one match of `p` and exactly one of `q`
/// says nothing about how many elements match either.
#[derive(Default)]
pub(super) struct PredicateCombination {
    applied: bool,
}

fn combined(name: &str, op: BinaryOp) -> Option<BinaryOp> {
    match (name, op) {
        ("all", BinaryOp::And) => Some(BinaryOp::And),
        ("any", BinaryOp::Or) => Some(BinaryOp::Or),
        ("none", BinaryOp::And) => Some(BinaryOp::Or),
        _ => None,
    }
}

impl Visitor for PredicateCombination {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Binary { op, left, right } = *ast.kind(id) else {
            return;
        };
        let NodeKind::Builtin { name, .. } = ast.kind(left) else {
            return;
        };
        let name = name.clone();
        let Some(merged_op) = combined(&name, op) else {
            return;
        };
        let (Some(&[xs, p]), Some(&[ys, q])) = (
            plain_builtin(ast, left, &name),
            plain_builtin(ast, right, &name),
        ) else {
            return;
        };
        if ast.nature(xs) != ast.nature(ys) || ast.print(xs) != ast.print(ys) {
            return;
        }
        let (Some(p_body), Some(q_body)) = (predicate_body(ast, p), predicate_body(ast, q)) else {
            return;
        };
        let body = ast.push_like(NodeKind::binary(merged_op, p_body, q_body), p_body);
        let predicate = ast.push_like(NodeKind::Predicate { body }, p);
        self.applied = true;
        ast.replace(id, NodeKind::builtin(name, vec![xs, predicate]));
    }
}

impl Pass for PredicateCombination {
    const NAME: &'static str = "predicate_combination";

    fn applied(&self) -> bool {
        self.applied
    }
}
