//! Sums computed ahead of time or unrolled.

use super::{Pass, int_literal, is_element, literal_range, predicate_body};
use crate::analyzer::{Nature, operator_result};
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, PointerKind};
use crate::visitor::Visitor;

/// Replaces sums over literal integer ranges with their closed form:
/// `sum(m..n)`, `sum(m..n, f)` for `f` one of `#`, `# * k`, `# + k`,
/// `# - k` (and the mirrored forms), and `reduce(m..n, # + #acc[, init])`.
///
/// Empty ranges and results that overflow are left to the loop.
#[derive(Default)]
pub(super) struct SumRange {
    applied: bool,
}

/// Element count and sum of `m..n`.
fn series(from: i64, to: i64) -> Option<(i64, i64)> {
    if to < from {
        return None;
    }
    let count = to.checked_sub(from)?.checked_add(1)?;
    let sum = i128::from(count) * (i128::from(from) + i128::from(to)) / 2;
    Some((count, i64::try_from(sum).ok()?))
}

/// Sum of `f(#)` over a series of `count` elements adding up to `sum`.
fn mapped_sum(ast: &Ast, body: NodeId, count: i64, sum: i64) -> Option<i64> {
    if is_element(ast, body) {
        return Some(sum);
    }
    let NodeKind::Binary { op, left, right } = *ast.kind(body) else {
        return None;
    };
    let (element_first, k) = if is_element(ast, left) {
        (true, int_literal(ast, right)?)
    } else if is_element(ast, right) {
        (false, int_literal(ast, left)?)
    } else {
        return None;
    };
    match op {
        BinaryOp::Multiply => sum.checked_mul(k),
        BinaryOp::Add => sum.checked_add(count.checked_mul(k)?),
        BinaryOp::Subtract if element_first => sum.checked_sub(count.checked_mul(k)?),
        BinaryOp::Subtract => count.checked_mul(k)?.checked_sub(sum),
        _ => None,
    }
}

/// `# + #acc` in either order.
fn is_accumulation(ast: &Ast, body: NodeId) -> bool {
    let NodeKind::Binary {
        op: BinaryOp::Add,
        left,
        right,
    } = *ast.kind(body)
    else {
        return false;
    };
    let pointer = |id| match ast.kind(id) {
        NodeKind::Pointer(kind) => Some(*kind),
        _ => None,
    };
    matches!(
        (pointer(left), pointer(right)),
        (Some(PointerKind::Element), Some(PointerKind::Acc))
            | (Some(PointerKind::Acc), Some(PointerKind::Element))
    )
}

impl SumRange {
    fn folded(ast: &Ast, id: NodeId) -> Option<i64> {
        let NodeKind::Builtin {
            name,
            args,
            map: None,
            ..
        } = ast.kind(id)
        else {
            return None;
        };
        let (from, to) = literal_range(ast, *args.first()?)?;
        let (count, sum) = series(from, to)?;
        match (name.as_str(), args.as_slice()) {
            ("sum", [_]) => Some(sum),
            ("sum", [_, f]) => mapped_sum(ast, predicate_body(ast, *f)?, count, sum),
            ("reduce", [_, f]) if is_accumulation(ast, predicate_body(ast, *f)?) => Some(sum),
            ("reduce", [_, f, init]) if is_accumulation(ast, predicate_body(ast, *f)?) => {
                sum.checked_add(int_literal(ast, *init)?)
            }
            _ => None,
        }
    }
}

impl Visitor for SumRange {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        if let Some(value) = Self::folded(ast, id) {
            self.applied = true;
            ast.replace(id, NodeKind::Integer(value));
            ast.set_nature(id, Nature::int());
        }
    }
}

impl Pass for SumRange {
    const NAME: &'static str = "sum_range";

    fn applied(&self) -> bool {
        self.applied
    }
}

/// `sum([a, b, c])` becomes `a + b + c` when every item is a number.
#[derive(Default)]
pub(super) struct SumArray {
    applied: bool,
}

impl Visitor for SumArray {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Builtin {
            name,
            args,
            map: None,
            ..
        } = ast.kind(id)
        else {
            return;
        };
        let &[array] = args.as_slice() else {
            return;
        };
        if name != "sum" {
            return;
        }
        let NodeKind::Array(items) = ast.kind(array) else {
            return;
        };
        if items.len() < 2
            || !items
                .iter()
                .all(|item| ast.nature(*item).is_some_and(Nature::is_number))
        {
            return;
        }
        let items = items.clone();
        let mut acc = items[0];
        for (i, item) in items.iter().enumerate().skip(1) {
            let nature = match (ast.nature(acc), ast.nature(*item)) {
                (Some(l), Some(r)) => operator_result(BinaryOp::Add, l, r),
                _ => None,
            }
            .unwrap_or_default();
            let add = NodeKind::binary(BinaryOp::Add, acc, *item);
            if i + 1 == items.len() {
                ast.replace(id, add);
                ast.set_nature(id, nature);
            } else {
                acc = ast.push_like(add, *item);
                ast.set_nature(acc, nature);
            }
        }
        self.applied = true;
    }
}

impl Pass for SumArray {
    const NAME: &'static str = "sum_array";

    fn applied(&self) -> bool {
        self.applied
    }
}
