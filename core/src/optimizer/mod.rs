//! Tree rewrites run between checking and code generation.
//!
//! Every pass is a [`Visitor`] working on exit, so children are already
//! rewritten when their parent is looked at. The passes run in a fixed
//! order, and the whole pipeline repeats until a round changes nothing.
//!
//! All rewrites preserve what a program evaluates to, including which
//! programs fail.

mod const_expr;
mod fold;
mod loops;
mod membership;
mod sums;


use tracing::{debug, trace};

use crate::api::CompilationOptions;
use crate::ast::{Ast, NodeId, NodeKind, PointerKind};
use crate::compiler::CompileError;
use crate::values::Value;
use crate::visitor::{Visitor, walk};

/// Rounds after which the pipeline stops even if passes keep firing.
const MAX_ROUNDS: usize = 1000;

/// A tree rewrite.
trait Pass: Visitor {
    const NAME: &'static str;

    /// Whether the last walk replaced any node.
    fn applied(&self) -> bool;

    /// First failure found while rewriting.
    fn take_error(&mut self) -> Option<CompileError> {
        None
    }
}

fn run<P: Pass>(ast: &mut Ast, mut pass: P) -> Result<bool, CompileError> {
    let root = ast.root();
    walk(ast, root, &mut pass);
    if let Some(err) = pass.take_error() {
        return Err(err);
    }
    let applied = pass.applied();
    if applied {
        trace!(pass = P::NAME, "rewrote");
    }
    Ok(applied)
}

/// Rewrites `ast` until no pass applies.
pub fn optimize(ast: &mut Ast, options: &CompilationOptions) -> Result<(), CompileError> {
    let nodes = ast.len();
    for round in 1..=MAX_ROUNDS {
        let mut changed = false;
        changed |= run(ast, membership::InArray::default())?;
        changed |= run(ast, fold::Fold::default())?;
        if !options.const_exprs.is_empty() {
            changed |= run(ast, const_expr::ConstExpr::new(options))?;
        }
        changed |= run(ast, membership::InRange::default())?;
        changed |= run(ast, loops::FilterMap::default())?;
        changed |= run(ast, loops::CountAny::default())?;
        changed |= run(ast, loops::CountThreshold::default())?;
        changed |= run(ast, loops::PredicateCombination::default())?;
        changed |= run(ast, sums::SumRange::default())?;
        changed |= run(ast, sums::SumArray::default())?;
        if !options.operators.is_empty() {
            changed |= run(ast, const_expr::Overload::new(options))?;
        }
        if !changed {
            debug!(rounds = round, nodes_before = nodes, nodes_after = ast.len(), "optimized");
            return Ok(());
        }
    }
    debug!(rounds = MAX_ROUNDS, "optimizer stopped at round limit");
    Ok(())
}

// ============================================================================
// Helpers shared by the passes
// ============================================================================

/// Value of a literal node.
fn literal_value(kind: &NodeKind) -> Option<Value> {
    Some(match kind {
        NodeKind::Nil => Value::Nil,
        NodeKind::Bool(b) => Value::Bool(*b),
        NodeKind::Integer(v) => Value::Int(*v),
        NodeKind::Float(v) => Value::Float64(*v),
        NodeKind::String(s) => Value::String(s.clone()),
        NodeKind::Constant(value) => value.clone(),
        _ => return None,
    })
}

fn int_literal(ast: &Ast, id: NodeId) -> Option<i64> {
    match ast.kind(id) {
        NodeKind::Integer(v) => Some(*v),
        _ => None,
    }
}

/// `m..n` with literal bounds.
fn literal_range(ast: &Ast, id: NodeId) -> Option<(i64, i64)> {
    match ast.kind(id) {
        NodeKind::Binary {
            op: crate::ast::BinaryOp::Range,
            left,
            right,
        } => Some((int_literal(ast, *left)?, int_literal(ast, *right)?)),
        _ => None,
    }
}

/// Body of a predicate argument.
fn predicate_body(ast: &Ast, id: NodeId) -> Option<NodeId> {
    match ast.kind(id) {
        NodeKind::Predicate { body } => Some(*body),
        _ => None,
    }
}

/// Whether the subtree reads an iteration pointer other than `#`.
fn uses_position(ast: &Ast, id: NodeId) -> bool {
    ast.any(id, &|kind| {
        matches!(
            kind,
            NodeKind::Pointer(PointerKind::Index | PointerKind::Acc)
        )
    })
}

fn is_element(ast: &Ast, id: NodeId) -> bool {
    matches!(ast.kind(id), NodeKind::Pointer(PointerKind::Element))
}
