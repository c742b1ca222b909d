//! Tree traversal for the expression arena.
//!
//! [`walk`] visits a subtree depth-first, calling [`Visitor::enter`] before
//! a node's children and [`Visitor::exit`] after them. Both hooks receive
//! the whole [`Ast`] and may rewrite the node in place with
//! [`Ast::replace`]; children are read after `enter` returns, so a node
//! replaced on entry is traversed in its new shape.

use crate::ast::{Ast, NodeId};

pub trait Visitor {
    fn enter(&mut self, _ast: &mut Ast, _id: NodeId) {}

    fn exit(&mut self, _ast: &mut Ast, _id: NodeId) {}
}

pub fn walk<V: Visitor + ?Sized>(ast: &mut Ast, id: NodeId, visitor: &mut V) {
    visitor.enter(ast, id);
    for child in ast.children(id) {
        walk(ast, child, visitor);
    }
    visitor.exit(ast, id);
}

/// Adapts a closure into a visitor that runs on exit.
pub struct ExitFn<F>(pub F);

impl<F: FnMut(&mut Ast, NodeId)> Visitor for ExitFn<F> {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        (self.0)(ast, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Order {
        entered: Vec<String>,
        exited: Vec<String>,
    }

    impl Visitor for Order {
        fn enter(&mut self, ast: &mut Ast, id: NodeId) {
            self.entered.push(ast.print(id));
        }

        fn exit(&mut self, ast: &mut Ast, id: NodeId) {
            self.exited.push(ast.print(id));
        }
    }

    #[test]
    fn test_pre_and_post_order() {
        let mut ast = parse("a + b * c").unwrap();
        let mut order = Order::default();
        let root = ast.root();
        walk(&mut ast, root, &mut order);
        assert_eq!(order.entered, vec!["a + b * c", "a", "b * c", "b", "c"]);
        assert_eq!(order.exited, vec!["a", "b", "c", "b * c", "a + b * c"]);
    }

    #[test]
    fn test_exit_rewrites_in_place() {
        let mut ast = parse("x + f(x)").unwrap();
        let root = ast.root();
        walk(
            &mut ast,
            root,
            &mut ExitFn(|ast: &mut Ast, id| {
                if matches!(ast.kind(id), NodeKind::Identifier { name, .. } if name == "x") {
                    ast.replace(id, NodeKind::Integer(1));
                }
            }),
        );
        assert_eq!(ast.print(root), "1 + f(1)");
    }

    #[test]
    fn test_enter_replacement_is_traversed() {
        struct Expand;
        impl Visitor for Expand {
            fn enter(&mut self, ast: &mut Ast, id: NodeId) {
                if matches!(ast.kind(id), NodeKind::Identifier { name, .. } if name == "y") {
                    let a = ast.push_like(NodeKind::identifier("a"), id);
                    let b = ast.push_like(NodeKind::identifier("b"), id);
                    ast.replace(id, NodeKind::binary(crate::ast::BinaryOp::Add, a, b));
                }
            }
        }
        let mut ast = parse("y * 2").unwrap();
        let root = ast.root();
        let mut order = Order::default();
        walk(&mut ast, root, &mut Expand);
        walk(&mut ast, root, &mut order);
        assert_eq!(order.exited, vec!["a", "b", "a + b", "2", "(a + b) * 2"]);
    }
}
