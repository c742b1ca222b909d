//! Rewrites that depend on host registrations: pure functions evaluated at
//! compile time and operator overloads.

use super::{Pass, literal_value};
use crate::analyzer::{Nature, find_overload, operator_result, rewrite_overload};
use crate::api::CompilationOptions;
use crate::ast::{Ast, NodeId, NodeKind};
use crate::compiler::{CompileError, CompileErrorKind};
use crate::values::{Callable, Function, Value};
use crate::visitor::Visitor;

/// Calls functions declared pure when all their arguments are literals and
/// splices the result into the tree. A failing call fails compilation.
pub(super) struct ConstExpr<'o> {
    options: &'o CompilationOptions,
    applied: bool,
    error: Option<CompileError>,
}

impl<'o> ConstExpr<'o> {
    pub(super) fn new(options: &'o CompilationOptions) -> Self {
        Self {
            options,
            applied: false,
            error: None,
        }
    }

    fn function(&self, name: &str) -> Option<Function> {
        if let Some(func) = self.options.functions.get(name) {
            return Some(func.clone());
        }
        match self.options.env.as_ref()?.lookup(name)? {
            Value::Func(func) => Some(func),
            _ => None,
        }
    }
}

fn literal_kind(value: Value) -> NodeKind {
    match value {
        Value::Nil => NodeKind::Nil,
        Value::Bool(b) => NodeKind::Bool(b),
        Value::Int(v) => NodeKind::Integer(v),
        Value::Float64(v) => NodeKind::Float(v),
        Value::String(s) => NodeKind::String(s),
        other => NodeKind::Constant(other),
    }
}

impl Visitor for ConstExpr<'_> {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        if self.error.is_some() {
            return;
        }
        let NodeKind::Call { callee, args, .. } = ast.kind(id) else {
            return;
        };
        let NodeKind::Identifier { name, .. } = ast.kind(*callee) else {
            return;
        };
        if !self.options.const_exprs.contains(name) {
            return;
        }
        let values: Option<Vec<Value>> = args
            .iter()
            .map(|arg| literal_value(ast.kind(*arg)))
            .collect();
        let Some(values) = values else {
            return;
        };
        let name = name.clone();
        let Some(func) = self.function(&name) else {
            return;
        };
        let Callable::Native(native) = &func.callable else {
            return;
        };
        match native(&values) {
            Ok(value) => {
                let nature = Nature::of_value(&value);
                self.applied = true;
                ast.replace(id, literal_kind(value));
                ast.set_nature(id, nature);
            }
            Err(err) => {
                self.error = Some(CompileError::new(
                    CompileErrorKind::ConstExpr {
                        name: name.to_string(),
                        message: err.message,
                    },
                    ast.span(id).clone(),
                ));
            }
        }
    }
}

impl Pass for ConstExpr<'_> {
    const NAME: &'static str = "const_expr";

    fn applied(&self) -> bool {
        self.applied
    }

    fn take_error(&mut self) -> Option<CompileError> {
        self.error.take()
    }
}

/// Turns binary operators the built-in rules reject into calls of a
/// registered overload. Catches operators whose operand natures only
/// became known after other rewrites.
pub(super) struct Overload<'o> {
    options: &'o CompilationOptions,
    applied: bool,
}

impl<'o> Overload<'o> {
    pub(super) fn new(options: &'o CompilationOptions) -> Self {
        Self {
            options,
            applied: false,
        }
    }
}

impl Visitor for Overload<'_> {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Binary { op, left, right } = *ast.kind(id) else {
            return;
        };
        let (Some(l), Some(r)) = (ast.nature(left), ast.nature(right)) else {
            return;
        };
        if l.is_unknown() || r.is_unknown() || operator_result(op, l, r).is_some() {
            return;
        }
        let Some((func, ty)) = find_overload(self.options, op, l, r) else {
            return;
        };
        let ret = Nature::of(ty.ret.clone());
        rewrite_overload(ast, id, func, left, right);
        ast.set_nature(id, ret);
        self.applied = true;
    }
}

impl Pass for Overload<'_> {
    const NAME: &'static str = "operator_overload";

    fn applied(&self) -> bool {
        self.applied
    }
}
