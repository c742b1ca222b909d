//! Tree patches registered with `CompilationOptions::patch`.

use exprel_core::api::{self, CompilationOptions, ErrorKind, MapEnv};
use exprel_core::ast::{Ast, BinaryOp, NodeId, NodeKind};
use exprel_core::values::Value;
use exprel_core::visitor::Visitor;
use pretty_assertions::assert_eq;

/// Replaces a named identifier with an integer literal.
#[derive(Clone)]
struct Inline {
    name: &'static str,
    value: i64,
}

impl Visitor for Inline {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        if let NodeKind::Identifier { name, .. } = ast.kind(id)
            && name.as_str() == self.name
        {
            ast.replace(id, NodeKind::Integer(self.value));
        }
    }
}

/// Rewrites `a - b` into `a + b`.
#[derive(Clone)]
struct FlipMinus;

impl Visitor for FlipMinus {
    fn enter(&mut self, ast: &mut Ast, id: NodeId) {
        if let NodeKind::Binary {
            op: BinaryOp::Subtract,
            left,
            right,
        } = ast.kind(id)
        {
            let (left, right) = (*left, *right);
            ast.replace(id, NodeKind::binary(BinaryOp::Add, left, right));
        }
    }
}

/// Routes bare names through a `ctx` map: `x` becomes `ctx.x`.
#[derive(Clone)]
struct Scoped;

impl Visitor for Scoped {
    fn exit(&mut self, ast: &mut Ast, id: NodeId) {
        let NodeKind::Identifier { name, .. } = ast.kind(id) else {
            return;
        };
        if name.as_str() == "ctx" {
            return;
        }
        let name = name.clone();
        let span = ast.span(id).clone();
        let object = ast.push(NodeKind::identifier("ctx"), span.clone());
        let property = ast.push(NodeKind::String(name), span);
        ast.replace(
            id,
            NodeKind::Member {
                object,
                property,
                optional: false,
                field: None,
                method: None,
            },
        );
    }
}

fn eval(source: &str, options: CompilationOptions, env: MapEnv) -> Value {
    let options = options.env(env.clone());
    let program = api::compile(source, &options).unwrap();
    api::run(&program, &env).unwrap()
}

#[test]
fn test_patch_replaces_names_before_checking() {
    let options = CompilationOptions::default().patch(Inline { name: "Answer", value: 42 });
    // `Answer` is not in the environment; checking sees the literal.
    assert_eq!(eval("Answer + 1", options, MapEnv::new()), Value::Int(43));
}

#[test]
fn test_patches_run_in_registration_order() {
    let options = CompilationOptions::default()
        .patch(FlipMinus)
        .patch(Inline { name: "n", value: 2 });
    assert_eq!(eval("10 - n", options, MapEnv::new()), Value::Int(12));
}

#[test]
fn test_patch_can_grow_the_tree() {
    let env = MapEnv::new().with("ctx", Value::map([("a", Value::Int(3)), ("b", Value::Int(4))]));
    let options = CompilationOptions::default().patch(Scoped);
    assert_eq!(eval("a * b", options, env), Value::Int(12));
}

#[test]
fn test_patched_tree_is_still_checked() {
    let options = CompilationOptions::default()
        .patch(Inline { name: "flag", value: 1 })
        .env(MapEnv::new());
    let err = api::compile("flag and true", &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn test_each_compilation_gets_a_fresh_patch() {
    #[derive(Clone, Default)]
    struct CountOnce {
        seen: bool,
    }

    impl Visitor for CountOnce {
        fn exit(&mut self, ast: &mut Ast, id: NodeId) {
            if !self.seen && matches!(ast.kind(id), NodeKind::Integer(_)) {
                self.seen = true;
                ast.replace(id, NodeKind::Integer(100));
            }
        }
    }

    let options = CompilationOptions::default().patch(CountOnce::default());
    for _ in 0..2 {
        assert_eq!(eval("1 + 2", options.clone(), MapEnv::new()), Value::Int(102));
    }
}
