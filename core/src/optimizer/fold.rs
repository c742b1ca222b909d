//! Constant folding.

use super::{Pass, literal_value, predicate_body};
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, PointerKind, UnaryOp};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::operators;
use crate::values::Value;
use crate::visitor::Visitor;
use crate::vm::RuntimeError;

/// Evaluates operators over literals, freezes literal arrays into
/// constants and merges `filter(filter(xs, p), q)`.
#[derive(Default)]
pub(super) struct Fold {
    applied: bool,
    error: Option<CompileError>,
}

/// Literal node for a folded value, when it has one.
fn literal_node(value: Value) -> Option<NodeKind> {
    Some(match value {
        Value::Nil => NodeKind::Nil,
        Value::Bool(b) => NodeKind::Bool(b),
        Value::Int(v) => NodeKind::Integer(v),
        Value::Float64(v) => NodeKind::Float(v),
        Value::String(s) => NodeKind::String(s),
        _ => return None,
    })
}

/// Plain literal, excluding constants that stand for containers.
fn scalar(ast: &Ast, id: NodeId) -> Option<Value> {
    match ast.kind(id) {
        NodeKind::Constant(_) => None,
        kind => literal_value(kind),
    }
}

fn binary_value(op: BinaryOp, a: &Value, b: &Value) -> Option<Result<Value, RuntimeError>> {
    let bool_of = |r: Result<bool, RuntimeError>| r.map(Value::Bool);
    Some(match op {
        BinaryOp::Add => operators::add(a, b),
        BinaryOp::Subtract => operators::subtract(a, b),
        BinaryOp::Multiply => operators::multiply(a, b),
        BinaryOp::Divide => operators::divide(a, b),
        BinaryOp::Modulo => operators::modulo(a, b),
        BinaryOp::Exponent => operators::exponent(a, b),
        BinaryOp::Equal => Ok(Value::Bool(operators::equal(a, b))),
        BinaryOp::NotEqual => Ok(Value::Bool(!operators::equal(a, b))),
        BinaryOp::Less => bool_of(operators::less(a, b)),
        BinaryOp::More => bool_of(operators::more(a, b)),
        BinaryOp::LessOrEqual => bool_of(operators::less_or_equal(a, b)),
        BinaryOp::MoreOrEqual => bool_of(operators::more_or_equal(a, b)),
        BinaryOp::Contains => bool_of(operators::contains(a, b)),
        BinaryOp::StartsWith => bool_of(operators::starts_with(a, b)),
        BinaryOp::EndsWith => bool_of(operators::ends_with(a, b)),
        _ => return None,
    })
}

impl Fold {
    fn patch(&mut self, ast: &mut Ast, id: NodeId, kind: NodeKind) {
        self.applied = true;
        ast.replace(id, kind);
    }

    fn unary(&mut self, ast: &mut Ast, id: NodeId, op: UnaryOp, operand: NodeId) {
        let Some(value) = scalar(ast, operand) else {
            return;
        };
        let folded = match (op, &value) {
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Negate, _) if value.is_number() => operators::negate(&value),
            (UnaryOp::Plus, _) if value.is_number() => operators::plus(&value),
            _ => return,
        };
        if let Ok(value) = folded
            && let Some(kind) = literal_node(value)
        {
            self.patch(ast, id, kind);
        }
    }

    fn binary(&mut self, ast: &mut Ast, id: NodeId, op: BinaryOp, left: NodeId, right: NodeId) {
        // Short-circuit forms fold as soon as the left side decides.
        let right_is_bool = matches!(ast.kind(right), NodeKind::Bool(_));
        match (op, ast.kind(left).clone()) {
            (BinaryOp::And, NodeKind::Bool(false)) | (BinaryOp::Or, NodeKind::Bool(true)) => {
                return self.take(ast, id, left);
            }
            (BinaryOp::And, NodeKind::Bool(true)) | (BinaryOp::Or, NodeKind::Bool(false))
                if right_is_bool =>
            {
                return self.take(ast, id, right);
            }
            (BinaryOp::Coalesce, NodeKind::Nil) => return self.take(ast, id, right),
            (BinaryOp::Coalesce, kind) if kind.is_literal() => return self.take(ast, id, left),
            _ => {}
        }
        let (Some(a), Some(b)) = (scalar(ast, left), scalar(ast, right)) else {
            return;
        };
        match binary_value(op, &a, &b) {
            Some(Ok(value)) => {
                if let Some(kind) = literal_node(value) {
                    self.patch(ast, id, kind);
                }
            }
            Some(Err(RuntimeError::DivideByZero)) => {
                let span = ast.operator_span(id).clone();
                self.error
                    .get_or_insert_with(|| CompileError::new(CompileErrorKind::DivideByZero, span));
            }
            // Other failures are left for the runtime to report.
            _ => {}
        }
    }

    fn take(&mut self, ast: &mut Ast, id: NodeId, with: NodeId) {
        self.applied = true;
        let nature = ast.nature(id).cloned();
        ast.replace_with_node(id, with);
        if let Some(nature) = nature {
            ast.set_nature(id, nature);
        }
    }

    fn array(&mut self, ast: &mut Ast, id: NodeId, items: &[NodeId]) {
        if items.is_empty() {
            return;
        }
        let values: Option<Vec<Value>> = items.iter().map(|item| scalar(ast, *item)).collect();
        if let Some(values) = values {
            self.patch(ast, id, NodeKind::Constant(Value::array(values)));
        }
    }

    /// `filter(filter(xs, p), q)` is `filter(xs, p && q)` unless either
    /// predicate depends on the position in its own input.
    fn filter_filter(&mut self, ast: &mut Ast, id: NodeId, args: &[NodeId]) {
        let [inner, outer_pred] = args else {
            return;
        };
        let NodeKind::Builtin {
            name,
            args: inner_args,
            map: None,
            ..
        } = ast.kind(*inner)
        else {
            return;
        };
        let [xs, inner_pred] = inner_args.as_slice() else {
            return;
        };
        if name != "filter" {
            return;
        }
        let (xs, inner_pred) = (*xs, *inner_pred);
        let (Some(p), Some(q)) = (predicate_body(ast, inner_pred), predicate_body(ast, *outer_pred))
        else {
            return;
        };
        let positional = |ast: &Ast, id: NodeId| {
            ast.any(id, &|k| matches!(k, NodeKind::Pointer(PointerKind::Index)))
        };
        if positional(ast, p) || positional(ast, q) {
            return;
        }
        let both = ast.push_like(NodeKind::binary(BinaryOp::And, p, q), q);
        let predicate = ast.push_like(NodeKind::Predicate { body: both }, *outer_pred);
        self.patch(ast, id, NodeKind::builtin("filter", vec![xs, predicate]));
    }
}

impl Visitor for Fold {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        if self.error.is_some() {
            return;
        }
        match ast.kind(id).clone() {
            NodeKind::Unary { op, operand } => self.unary(ast, id, op, operand),
            NodeKind::Binary { op, left, right } => self.binary(ast, id, op, left, right),
            NodeKind::Array(items) => self.array(ast, id, &items),
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => match (ast.kind(cond).clone(), then) {
                (NodeKind::Bool(true), Some(then)) => self.take(ast, id, then),
                (NodeKind::Bool(true), None) => self.take(ast, id, cond),
                (NodeKind::Bool(false), _) => self.take(ast, id, otherwise),
                _ => {}
            },
            NodeKind::Builtin {
                name,
                args,
                map: None,
                ..
            } if name == "filter" => self.filter_filter(ast, id, &args),
            _ => {}
        }
    }
}

impl Pass for Fold {
    const NAME: &'static str = "fold";

    fn applied(&self) -> bool {
        self.applied
    }

    fn take_error(&mut self) -> Option<CompileError> {
        self.error.take()
    }
}
