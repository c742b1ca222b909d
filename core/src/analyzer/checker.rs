//! Type checker.
//!
//! Walks the tree top-down, stores a [`Nature`] on every node and rewrites
//! what the later stages want resolved up front:
//! - calls of library functions become `Builtin` nodes,
//! - operators without a built-in meaning become calls of registered
//!   overloads,
//! - `matches` with a literal pattern carries its compiled regex,
//! - struct members carry their field path or method slot,
//! - integer literals passed to sized parameters are retyped.
//!
//! Errors are collected; checking continues with an unknown nature so one
//! mistake does not hide the next.

use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::EcoString;
use regex::Regex;
use tracing::{debug, trace};

use super::error::{TypeError, TypeErrorKind};
use super::nature::{FuncInfo, Nature};
use crate::api::{CompilationOptions, Environment, Expect};
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, PointerKind, UnaryOp};
use crate::builtins::{self, BuiltinCheckError};
use crate::diagnostics::context::Context;
use crate::types::{FloatKind, FunctionType, IntKind, Kind, Type};
use crate::values::{Function, Value};

/// Checks `ast` in place and returns the nature of its root.
pub fn check(ast: &mut Ast, options: &CompilationOptions) -> Result<Nature, Vec<TypeError>> {
    let env = options.env.as_deref();
    let strict = env.is_some_and(|env| env.is_strict()) && !options.allow_undefined;
    let mut checker = Checker {
        options,
        env,
        strict,
        lets: Vec::new(),
        scopes: Vec::new(),
        errors: Vec::new(),
    };
    let root = ast.root();
    let nature = checker.visit(ast, root);
    checker.expect_result(ast, root, &nature);
    if checker.errors.is_empty() {
        debug!(nodes = ast.len(), result = %nature, "checked");
        Ok(nature)
    } else {
        debug!(errors = checker.errors.len(), "check failed");
        Err(checker.errors)
    }
}

/// Natures visible to the predicate of one loop builtin.
struct Scope {
    elem: Nature,
    acc: Nature,
}

struct Checker<'o> {
    options: &'o CompilationOptions,
    env: Option<&'o dyn Environment>,
    strict: bool,
    lets: Vec<(EcoString, Nature)>,
    scopes: Vec<Scope>,
    errors: Vec<TypeError>,
}

/// Nature of a registered host function.
fn function_nature(func: &Function) -> Nature {
    Nature::function(FuncInfo {
        name: func.name.clone(),
        types: func.types.clone(),
        typed: func.typed.as_ref().map(|t| t.signature()),
    })
}

fn mismatch(op: &str, l: &Nature, r: &Nature) -> TypeErrorKind {
    let (l, r) = (l.to_string(), r.to_string());
    let message = if l == r {
        format!("invalid operation: {} {} {}", l, op, r)
    } else {
        format!(
            "invalid operation: {} {} {} (mismatched types {} and {})",
            l, op, r, l, r
        )
    };
    TypeErrorKind::Mismatched { message }
}

fn both(l: &Nature, r: &Nature, ok: fn(&Nature) -> bool) -> bool {
    (l.is_unknown() || ok(l)) && (r.is_unknown() || ok(r))
}

/// Integer literal rewritten for a parameter of a sized numeric type.
fn retyped_literal(value: i64, target: &Type) -> Option<Value> {
    Some(match target {
        Type::Int(kind) if !kind.fits(value) => return None,
        Type::Int(IntKind::Int) => Value::Int(value),
        Type::Int(IntKind::Int8) => Value::Int8(value as i8),
        Type::Int(IntKind::Int16) => Value::Int16(value as i16),
        Type::Int(IntKind::Int32) => Value::Int32(value as i32),
        Type::Int(IntKind::Int64) => Value::Int64(value),
        Type::Int(IntKind::Uint) => Value::Uint(value as u64),
        Type::Int(IntKind::Uint8) => Value::Uint8(value as u8),
        Type::Int(IntKind::Uint16) => Value::Uint16(value as u16),
        Type::Int(IntKind::Uint32) => Value::Uint32(value as u32),
        Type::Int(IntKind::Uint64) => Value::Uint64(value as u64),
        Type::Float(FloatKind::Float64) => Value::Float64(value as f64),
        Type::Float(FloatKind::Float32) => Value::Float32(value as f32),
        _ => return None,
    })
}

/// Result of a built-in operator, or `None` when it rejects the operand
/// natures.
pub(crate) fn operator_result(op: BinaryOp, l: &Nature, r: &Nature) -> Option<Nature> {
    let unknown = l.is_unknown() || r.is_unknown();
    let numbers = both(l, r, Nature::is_number);
    match op {
        BinaryOp::Or | BinaryOp::And => both(l, r, Nature::is_bool).then(Nature::bool),
        BinaryOp::Equal | BinaryOp::NotEqual => l.comparable(r).then(Nature::bool),
        BinaryOp::Less | BinaryOp::More | BinaryOp::LessOrEqual | BinaryOp::MoreOrEqual => {
            let ordered = unknown
                || (l.is_number() && r.is_number())
                || (l.is_string() && r.is_string())
                || (l.is_time() && r.is_time())
                || (l.is_duration() && r.is_duration());
            ordered.then(Nature::bool)
        }
        BinaryOp::In | BinaryOp::NotIn => {
            let ok = match r.kind() {
                _ if r.is_unknown() => true,
                Kind::Array => true,
                Kind::Map | Kind::Struct | Kind::String => l.is_unknown() || l.is_string(),
                _ => false,
            };
            ok.then(Nature::bool)
        }
        BinaryOp::Matches | BinaryOp::Contains | BinaryOp::StartsWith | BinaryOp::EndsWith => {
            both(l, r, Nature::is_string).then(Nature::bool)
        }
        BinaryOp::Range => {
            both(l, r, Nature::is_integer).then(|| Nature::array_of(Type::INT))
        }
        BinaryOp::Coalesce => Some(l.lub(r)),
        BinaryOp::Add => match (l.kind(), r.kind()) {
            _ if l.is_integer() && r.is_integer() => Some(Nature::int()),
            _ if l.is_number() && r.is_number() => Some(Nature::float()),
            (Kind::String, Kind::String) => Some(Nature::string()),
            (Kind::String, _) | (_, Kind::String) if l.is_number() || r.is_number() => {
                Some(Nature::string())
            }
            (Kind::Time, Kind::Duration) | (Kind::Duration, Kind::Time) => {
                Some(Nature::of(Type::Time))
            }
            (Kind::Duration, Kind::Duration) => Some(Nature::of(Type::Duration)),
            _ if unknown && !l.nil && !r.nil => Some(Nature::unknown()),
            _ => None,
        },
        BinaryOp::Subtract => match (l.kind(), r.kind()) {
            _ if l.is_integer() && r.is_integer() => Some(Nature::int()),
            _ if l.is_number() && r.is_number() => Some(Nature::float()),
            (Kind::Time, Kind::Time) => Some(Nature::of(Type::Duration)),
            (Kind::Time, Kind::Duration) => Some(Nature::of(Type::Time)),
            (Kind::Duration, Kind::Duration) => Some(Nature::of(Type::Duration)),
            _ if unknown => Some(Nature::unknown()),
            _ => None,
        },
        BinaryOp::Multiply => match (l.kind(), r.kind()) {
            _ if l.is_integer() && r.is_integer() => Some(Nature::int()),
            _ if l.is_number() && r.is_number() => Some(Nature::float()),
            (Kind::Duration, _) if r.is_number() => Some(Nature::of(Type::Duration)),
            (_, Kind::Duration) if l.is_number() => Some(Nature::of(Type::Duration)),
            _ if unknown => Some(Nature::unknown()),
            _ => None,
        },
        BinaryOp::Divide => match (l.kind(), r.kind()) {
            _ if l.is_number() && r.is_number() => Some(Nature::float()),
            (Kind::Duration, Kind::Duration) => Some(Nature::float()),
            (Kind::Duration, _) if r.is_number() => Some(Nature::of(Type::Duration)),
            _ if unknown => Some(Nature::unknown()),
            _ => None,
        },
        BinaryOp::Modulo => both(l, r, Nature::is_integer).then(Nature::int),
        BinaryOp::Exponent => numbers.then(Nature::float),
    }
}

/// First registered overload of `op` whose signature accepts `l` and `r`.
pub(crate) fn find_overload<'o>(
    options: &'o CompilationOptions,
    op: BinaryOp,
    l: &Nature,
    r: &Nature,
) -> Option<(&'o Function, &'o FunctionType)> {
    let names = options.operators.get(op.as_str())?;
    names.iter().find_map(|name| {
        let func = options.functions.get(name)?;
        let ty = func.types.iter().find(|ty| {
            ty.accepts_count(2)
                && ty.param(0).is_some_and(|p| l.assignable_to(p))
                && ty.param(1).is_some_and(|p| r.assignable_to(p))
        })?;
        Some((func, ty))
    })
}

/// Turns node `id` into `func(left, right)`.
pub(crate) fn rewrite_overload(
    ast: &mut Ast,
    id: NodeId,
    func: &Function,
    left: NodeId,
    right: NodeId,
) {
    let callee = ast.push(NodeKind::identifier(func.name.clone()), ast.span(id).clone());
    ast.set_nature(callee, function_nature(func));
    ast.replace(
        id,
        NodeKind::Call {
            callee,
            args: vec![left, right],
            fast: false,
            typed: None,
        },
    );
}

/// Minimum and maximum argument count of a loop builtin.
fn loop_arity(name: &str) -> (usize, usize) {
    match name {
        "count" | "sum" => (1, 2),
        "sortBy" | "reduce" => (2, 3),
        _ => (2, 2),
    }
}

/// Loop builtins whose predicate must yield a bool.
fn wants_bool(name: &str) -> bool {
    !matches!(name, "map" | "sum" | "groupBy" | "sortBy" | "reduce")
}

impl Checker<'_> {
    fn error(&mut self, ast: &Ast, id: NodeId, kind: TypeErrorKind) -> Nature {
        trace!(%kind, "type error");
        self.errors.push(TypeError::new(kind, ast.span(id).clone()));
        Nature::unknown()
    }

    fn visit(&mut self, ast: &mut Ast, id: NodeId) -> Nature {
        let nature = self.visit_kind(ast, id);
        ast.set_nature(id, nature.clone());
        nature
    }

    fn visit_kind(&mut self, ast: &mut Ast, id: NodeId) -> Nature {
        match ast.kind(id).clone() {
            NodeKind::Nil => Nature::nil(),
            NodeKind::Bool(_) => Nature::bool(),
            NodeKind::Integer(_) => Nature::int(),
            NodeKind::Float(_) => Nature::float(),
            NodeKind::String(_) => Nature::string(),
            NodeKind::Constant(value) => Nature::of_value(&value),
            NodeKind::Identifier { name, .. } => self.identifier(ast, id, &name),
            NodeKind::Unary { op, operand } => self.unary(ast, id, op, operand),
            NodeKind::Binary { op, left, right } => self.binary(ast, id, op, left, right),
            NodeKind::Matches { left, right, .. } => self.matches(ast, id, left, right),
            NodeKind::Chain { inner } => self.visit(ast, inner),
            NodeKind::Member {
                object, property, ..
            } => self.member(ast, id, object, property, false),
            NodeKind::Slice { array, from, to } => self.slice(ast, id, array, from, to),
            NodeKind::Call { callee, args, .. } => self.call(ast, id, callee, args),
            NodeKind::Builtin { name, args, .. } => self.builtin(ast, id, &name, &args),
            NodeKind::Predicate { body } => self.visit(ast, body),
            NodeKind::Pointer(kind) => self.pointer(kind),
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let c = self.visit(ast, cond);
                if !c.is_unknown() && !c.is_bool() {
                    self.error(ast, cond, TypeErrorKind::ExpectedBool { found: c.to_string() });
                }
                let first = match then {
                    Some(then) => self.visit(ast, then),
                    None => c,
                };
                let second = self.visit(ast, otherwise);
                first.lub(&second)
            }
            NodeKind::Array(items) => {
                let elem = items
                    .iter()
                    .map(|item| self.visit(ast, *item))
                    .reduce(|a, b| a.lub(&b))
                    .map_or(Type::Any, |n| n.ty);
                Nature::array_of(elem)
            }
            NodeKind::Map(pairs) => self.map(ast, &pairs),
            NodeKind::Pair { key, value } => {
                let k = self.visit(ast, key);
                if !k.is_unknown() && !k.is_string() {
                    self.error(
                        ast,
                        key,
                        TypeErrorKind::Mismatched {
                            message: format!("map key must be a string (got {})", k),
                        },
                    );
                }
                self.visit(ast, value)
            }
            NodeKind::VariableDeclarator { name, value, body } => {
                let nature = self.visit(ast, value);
                self.lets.push((name, nature));
                let result = self.visit(ast, body);
                self.lets.pop();
                result
            }
        }
    }

    // ========================================================================
    // Names
    // ========================================================================

    fn identifier(&mut self, ast: &mut Ast, id: NodeId, name: &EcoString) -> Nature {
        if let Some((_, nature)) = self.lets.iter().rev().find(|(n, _)| n == name) {
            return nature.clone();
        }
        if let Some(func) = self.options.functions.get(name) {
            return function_nature(func);
        }
        let Some(env) = self.env else {
            return self.undefined(ast, id, name);
        };
        if let Some((path, ty)) = env.field_index(name) {
            let nature = env.nature_of(name).unwrap_or_else(|| Nature::of(ty));
            let pointer = matches!(nature.ty, Type::Pointer(_));
            if let NodeKind::Identifier { field, deref, .. } = ast.kind_mut(id) {
                *field = Some(path);
                *deref = pointer;
            }
            return Self::strip_pointer(nature);
        }
        if let Some((index, ty)) = env.method_index(name) {
            if let NodeKind::Identifier { method, .. } = ast.kind_mut(id) {
                *method = Some(index);
            }
            return Nature {
                method: Some(index),
                ..Nature::of(Type::Func(Arc::new(ty)))
            };
        }
        if let Some(nature) = env.nature_of(name) {
            if matches!(nature.ty, Type::Pointer(_))
                && let NodeKind::Identifier { deref, .. } = ast.kind_mut(id)
            {
                *deref = true;
            }
            return Self::strip_pointer(nature);
        }
        self.undefined(ast, id, name)
    }

    /// Identifiers bound to pointers load dereferenced.
    fn strip_pointer(nature: Nature) -> Nature {
        if !matches!(nature.ty, Type::Pointer(_)) {
            return nature;
        }
        let ty = nature.ty.deref().clone();
        Nature { ty, ..nature }
    }

    fn undefined(&mut self, ast: &Ast, id: NodeId, name: &str) -> Nature {
        if self.strict {
            return self.error(
                ast,
                id,
                TypeErrorKind::UnknownName {
                    name: name.to_string(),
                },
            );
        }
        Nature::unknown()
    }

    fn pointer(&self, kind: PointerKind) -> Nature {
        let Some(scope) = self.scopes.last() else {
            return Nature::unknown();
        };
        match kind {
            PointerKind::Element => scope.elem.clone(),
            PointerKind::Index => Nature::int(),
            PointerKind::Acc => scope.acc.clone(),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn unary(&mut self, ast: &mut Ast, id: NodeId, op: UnaryOp, operand: NodeId) -> Nature {
        let n = self.visit(ast, operand);
        match op {
            UnaryOp::Not if n.is_unknown() || n.is_bool() => Nature::bool(),
            UnaryOp::Negate | UnaryOp::Plus if n.is_unknown() => Nature::unknown(),
            UnaryOp::Negate if n.is_integer() => Nature::int(),
            UnaryOp::Negate if n.is_float() => Nature::float(),
            UnaryOp::Negate | UnaryOp::Plus if n.is_number() || n.is_duration() => {
                Nature::of(n.ty.clone())
            }
            _ => self.error(
                ast,
                id,
                TypeErrorKind::Mismatched {
                    message: format!("invalid operation: {}{}", op.as_str(), n),
                },
            ),
        }
    }

    fn binary(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> Nature {
        if op == BinaryOp::Matches {
            ast.replace(
                id,
                NodeKind::Matches {
                    left,
                    right,
                    regex: None,
                },
            );
            return self.matches(ast, id, left, right);
        }
        let l = self.visit(ast, left);
        let r = self.visit(ast, right);
        if let Some(nature) = operator_result(op, &l, &r) {
            return nature;
        }
        if let Some(nature) = self.overload(ast, id, op, left, right, &l, &r) {
            return nature;
        }
        self.error(ast, id, mismatch(op.as_str(), &l, &r))
    }

    /// Rewrites `left op right` into a call of the first registered
    /// overload of `op` accepting both operands.
    #[allow(clippy::too_many_arguments)]
    fn overload(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        l: &Nature,
        r: &Nature,
    ) -> Option<Nature> {
        let (func, ty) = find_overload(self.options, op, l, r)?;
        debug!(op = op.as_str(), function = %func.name, "operator overload");
        rewrite_overload(ast, id, func, left, right);
        Some(Nature::of(ty.ret.clone()))
    }

    fn matches(&mut self, ast: &mut Ast, id: NodeId, left: NodeId, right: NodeId) -> Nature {
        let l = self.visit(ast, left);
        let r = self.visit(ast, right);
        if !both(&l, &r, Nature::is_string) {
            return self.error(ast, id, mismatch("matches", &l, &r));
        }
        if let NodeKind::String(pattern) = ast.kind(right).clone() {
            match Regex::new(&pattern) {
                Ok(compiled) => {
                    if let NodeKind::Matches { regex, .. } = ast.kind_mut(id) {
                        *regex = Some(Arc::new(compiled));
                    }
                }
                Err(err) => {
                    return self.error(
                        ast,
                        right,
                        TypeErrorKind::BadRegex {
                            message: err.to_string(),
                        },
                    );
                }
            }
        }
        Nature::bool()
    }

    // ========================================================================
    // Members
    // ========================================================================

    fn member(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        object: NodeId,
        property: NodeId,
        callee: bool,
    ) -> Nature {
        let obj = self.visit(ast, object);
        let prop = self.visit(ast, property);
        if obj.is_unknown() {
            return Nature::unknown();
        }
        let name = match ast.kind(property) {
            NodeKind::String(s) => Some(s.clone()),
            _ => None,
        };
        match obj.ty.deref() {
            Type::Struct(st) => {
                let Some(name) = name else {
                    if !prop.is_unknown() && !prop.is_string() {
                        return self.error(
                            ast,
                            property,
                            TypeErrorKind::Mismatched {
                                message: format!("cannot use {} as key to {}", prop, st.name),
                            },
                        );
                    }
                    return Nature::unknown();
                };
                if let Some((path, ty)) = st.resolve_field(&name) {
                    if let NodeKind::Member { field, .. } = ast.kind_mut(id) {
                        *field = Some(path);
                    }
                    return Nature::of(ty);
                }
                if let Some((index, def)) = st.method_index(&name) {
                    let ty = Type::Func(Arc::new(def.ty.clone()));
                    if let NodeKind::Member { method, .. } = ast.kind_mut(id) {
                        *method = Some(index);
                    }
                    return Nature {
                        method: Some(index),
                        ..Nature::of(ty)
                    };
                }
                let (name, ty) = (name.to_string(), st.name.to_string());
                let kind = if callee {
                    TypeErrorKind::UnknownMethod { name, ty }
                } else {
                    TypeErrorKind::UnknownField { name, ty }
                };
                self.error(ast, property, kind)
            }
            Type::Map(_) => {
                if !prop.is_unknown() && !prop.is_string() {
                    return self.error(
                        ast,
                        property,
                        TypeErrorKind::Mismatched {
                            message: format!("cannot use {} as key to {}", prop, obj),
                        },
                    );
                }
                match name.as_deref().and_then(|n| obj.field(n)) {
                    Some(field) => field,
                    None if obj.fields.is_some() => Nature::unknown(),
                    None => obj.elem(),
                }
            }
            Type::Array(_) | Type::String => {
                if !prop.is_unknown() && !prop.is_integer() {
                    return self.error(
                        ast,
                        property,
                        TypeErrorKind::NonIntegerIndex {
                            ty: prop.to_string(),
                        },
                    );
                }
                if obj.is_string() {
                    Nature::string()
                } else {
                    obj.elem()
                }
            }
            _ => match name {
                Some(name) => self.error(
                    ast,
                    property,
                    TypeErrorKind::UnknownField {
                        name: name.to_string(),
                        ty: obj.to_string(),
                    },
                ),
                None => self.error(
                    ast,
                    id,
                    TypeErrorKind::Mismatched {
                        message: format!("cannot index {}", obj),
                    },
                ),
            },
        }
    }

    fn slice(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        array: NodeId,
        from: Option<NodeId>,
        to: Option<NodeId>,
    ) -> Nature {
        let a = self.visit(ast, array);
        for bound in [from, to].into_iter().flatten() {
            let b = self.visit(ast, bound);
            if !b.is_unknown() && !b.is_integer() {
                self.error(ast, bound, TypeErrorKind::NonIntegerIndex { ty: b.to_string() });
            }
        }
        if a.is_unknown() {
            return Nature::unknown();
        }
        if !a.is_array() && !a.is_string() {
            return self.error(ast, id, TypeErrorKind::CannotSlice { ty: a.to_string() });
        }
        Nature::of(a.ty.deref().clone())
    }

    fn map(&mut self, ast: &mut Ast, pairs: &[NodeId]) -> Nature {
        let mut fields = BTreeMap::new();
        let mut literal_keys = true;
        let mut elem: Option<Nature> = None;
        for pair in pairs {
            let value = self.visit(ast, *pair);
            match ast.kind(*pair) {
                NodeKind::Pair { key, .. } => match ast.kind(*key) {
                    NodeKind::String(name) => {
                        fields.insert(name.clone(), value.clone());
                    }
                    _ => literal_keys = false,
                },
                _ => literal_keys = false,
            }
            elem = Some(match elem {
                Some(prev) => prev.lub(&value),
                None => value,
            });
        }
        let elem = elem.map_or(Type::Any, |n| n.ty);
        Nature {
            fields: literal_keys.then(|| Arc::new(fields)),
            ..Nature::of(Type::map(elem))
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn call(&mut self, ast: &mut Ast, id: NodeId, callee: NodeId, args: Vec<NodeId>) -> Nature {
        if let NodeKind::Identifier { name, .. } = ast.kind(callee).clone()
            && !self.lets.iter().any(|(n, _)| *n == name)
            && !self.options.functions.contains_key(&name)
        {
            if let Some((_, builtin)) = builtins::lookup(&name)
                && !self.options.disabled_builtins.contains(&name)
            {
                debug!(name = builtin.name, "builtin call");
                ast.replace(id, NodeKind::builtin(name.clone(), args.clone()));
                return self.builtin(ast, id, &name, &args);
            }
            let in_env = self.env.is_some_and(|env| env.nature_of(&name).is_some());
            if self.options.disabled_builtins.contains(&name) && !in_env {
                return self.error(
                    ast,
                    callee,
                    TypeErrorKind::UnknownBuiltin {
                        name: name.to_string(),
                    },
                );
            }
        }

        let f = match ast.kind(callee).clone() {
            NodeKind::Member {
                object, property, ..
            } => {
                let nature = self.member(ast, callee, object, property, true);
                ast.set_nature(callee, nature.clone());
                nature
            }
            _ => self.visit(ast, callee),
        };
        let natures: Vec<Nature> = args.iter().map(|arg| self.visit(ast, *arg)).collect();
        let name = Self::callee_name(ast, callee);

        if f.nil {
            return self.error(ast, callee, TypeErrorKind::NotAFunction { ty: f.to_string() });
        }
        let types = match (&f.func, &f.ty) {
            (Some(info), _) => info.types.clone(),
            (None, Type::Func(ty)) => vec![(**ty).clone()],
            (None, Type::Any) => return Nature::unknown(),
            _ => {
                return self.error(ast, callee, TypeErrorKind::NotAFunction { ty: f.to_string() });
            }
        };

        let fast = matches!(types.as_slice(), [ty]
            if ty.variadic && ty.params.len() == 1 && ty.params[0].is_any() && ty.ret.is_any());
        let typed = f.func.as_ref().and_then(|info| info.typed).filter(|_| args.is_empty());
        if let NodeKind::Call {
            fast: is_fast,
            typed: typed_slot,
            ..
        } = ast.kind_mut(id)
        {
            *is_fast = fast;
            *typed_slot = typed;
        }
        if types.is_empty() {
            return Nature::unknown();
        }

        let before = self.errors.len();
        let result = self.signature(ast, id, &name, &types, &args, &natures);
        let span = ast.span(callee).clone();
        for err in &mut self.errors[before..] {
            err.context.push(Context::InFunctionCall {
                name: Some(name.clone()),
                span: span.clone(),
            });
        }
        result
    }

    fn callee_name(ast: &Ast, callee: NodeId) -> String {
        match ast.kind(callee) {
            NodeKind::Identifier { name, .. } => name.to_string(),
            NodeKind::Member { property, .. } => match ast.kind(*property) {
                NodeKind::String(s) => s.to_string(),
                _ => "function".to_string(),
            },
            _ => "function".to_string(),
        }
    }

    fn arg_fits(ast: &Ast, arg: NodeId, nature: &Nature, param: &Type) -> bool {
        if let NodeKind::Integer(v) = ast.kind(arg)
            && retyped_literal(*v, param).is_some()
        {
            return true;
        }
        nature.assignable_to(param)
    }

    /// Picks the first declared signature accepting the arguments.
    fn signature(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        name: &str,
        types: &[FunctionType],
        args: &[NodeId],
        natures: &[Nature],
    ) -> Nature {
        let counted: Vec<&FunctionType> =
            types.iter().filter(|ty| ty.accepts_count(args.len())).collect();
        if counted.is_empty() {
            let too_many = types.iter().all(|ty| args.len() > ty.min_args());
            return self.error(
                ast,
                id,
                TypeErrorKind::Arity {
                    name: name.to_string(),
                    too_many,
                },
            );
        }
        let chosen = counted.iter().find(|ty| {
            args.iter().zip(natures).enumerate().all(|(i, (arg, nature))| {
                ty.param(i)
                    .is_some_and(|param| Self::arg_fits(ast, *arg, nature, param))
            })
        });
        let Some(ty) = chosen else {
            if let [ty] = counted.as_slice() {
                for (i, (arg, nature)) in args.iter().zip(natures).enumerate() {
                    if let Some(param) = ty.param(i)
                        && !Self::arg_fits(ast, *arg, nature, param)
                    {
                        return self.error(
                            ast,
                            *arg,
                            TypeErrorKind::Mismatched {
                                message: format!(
                                    "cannot use {} as argument (type {}) to call {}",
                                    nature, param, name
                                ),
                            },
                        );
                    }
                }
            }
            let found: Vec<String> = natures.iter().map(|n| n.to_string()).collect();
            return self.error(
                ast,
                id,
                TypeErrorKind::Mismatched {
                    message: format!("no matching overload of {} for ({})", name, found.join(", ")),
                },
            );
        };
        for (i, arg) in args.iter().enumerate() {
            let Some(param) = ty.param(i) else { continue };
            if let NodeKind::Integer(v) = ast.kind(*arg)
                && !matches!(param, Type::Int(IntKind::Int) | Type::Any)
                && let Some(value) = retyped_literal(*v, param)
            {
                trace!(%param, "retyped integer literal");
                ast.replace(*arg, NodeKind::Constant(value));
                ast.set_nature(*arg, Nature::of(param.clone()));
            }
        }
        Nature::of(ty.ret.clone())
    }

    // ========================================================================
    // Builtins
    // ========================================================================

    fn builtin(&mut self, ast: &mut Ast, id: NodeId, name: &EcoString, args: &[NodeId]) -> Nature {
        let Some((_, builtin)) = builtins::lookup(name) else {
            return self.error(
                ast,
                id,
                TypeErrorKind::UnknownBuiltin {
                    name: name.to_string(),
                },
            );
        };
        if self.options.disabled_builtins.contains(name) {
            return self.error(
                ast,
                id,
                TypeErrorKind::UnknownBuiltin {
                    name: name.to_string(),
                },
            );
        }
        if builtin.is_loop() {
            return self.loop_builtin(ast, id, name, args);
        }
        let natures: Vec<Nature> = args.iter().map(|arg| self.visit(ast, *arg)).collect();
        match (builtin.check)(name, &natures) {
            Ok(nature) => nature,
            Err(BuiltinCheckError::Arity { too_many }) => self.error(
                ast,
                id,
                TypeErrorKind::Arity {
                    name: name.to_string(),
                    too_many,
                },
            ),
            Err(BuiltinCheckError::Argument(message)) => {
                self.error(ast, id, TypeErrorKind::Mismatched { message })
            }
        }
    }

    fn loop_builtin(&mut self, ast: &mut Ast, id: NodeId, name: &str, args: &[NodeId]) -> Nature {
        let (min, max) = loop_arity(name);
        if args.len() < min || args.len() > max {
            return self.error(
                ast,
                id,
                TypeErrorKind::Arity {
                    name: name.to_string(),
                    too_many: args.len() > max,
                },
            );
        }
        let collection = self.visit(ast, args[0]);
        if !collection.is_unknown() && !collection.is_array() {
            return self.error(
                ast,
                args[0],
                TypeErrorKind::Mismatched {
                    message: format!("builtin {} takes only array (got {})", name, collection),
                },
            );
        }
        let elem = collection.elem();

        // Arguments after the predicate belong to the outer scope.
        let mut init = None;
        if let Some(extra) = args.get(2) {
            let nature = self.visit(ast, *extra);
            if name == "sortBy" && !nature.is_unknown() && !nature.is_string() {
                self.error(
                    ast,
                    *extra,
                    TypeErrorKind::Mismatched {
                        message: format!("sortBy order must be a string (got {})", nature),
                    },
                );
            }
            init = Some(nature);
        }

        let body = match args.get(1) {
            Some(predicate) => {
                let acc = init.clone().unwrap_or_else(|| elem.clone());
                self.scopes.push(Scope {
                    elem: elem.clone(),
                    acc,
                });
                let before = self.errors.len();
                let body = self.visit(ast, *predicate);
                self.scopes.pop();
                let span = ast.span(id).clone();
                for err in &mut self.errors[before..] {
                    err.context.push(Context::InPredicate {
                        builtin: name.to_string(),
                        span: span.clone(),
                    });
                }
                if wants_bool(name) && !body.is_unknown() && !body.is_bool() {
                    return self.error(
                        ast,
                        *predicate,
                        TypeErrorKind::Mismatched {
                            message: format!(
                                "predicate of {} should return boolean (got {})",
                                name, body
                            ),
                        },
                    );
                }
                body
            }
            // `count(xs)` counts true elements, `sum(xs)` adds them up.
            None => {
                let ok = match name {
                    "count" => elem.is_unknown() || elem.is_bool(),
                    _ => elem.is_unknown() || elem.is_number(),
                };
                if !ok {
                    return self.error(
                        ast,
                        args[0],
                        TypeErrorKind::Mismatched {
                            message: format!("invalid argument for {} (type {})", name, collection),
                        },
                    );
                }
                elem.clone()
            }
        };

        match name {
            "all" | "none" | "any" | "one" => Nature::bool(),
            "filter" | "sortBy" => Nature::of(collection.ty.deref().clone()),
            "map" => Nature::array_of(body.ty),
            "count" | "findIndex" | "findLastIndex" => Nature::int(),
            "find" | "findLast" => elem,
            "groupBy" => Nature::of(Type::map(Type::array(elem.ty))),
            "sum" if body.is_integer() => Nature::int(),
            "sum" if body.is_float() => Nature::float(),
            "sum" if body.is_unknown() => Nature::unknown(),
            "sum" => self.error(
                ast,
                id,
                TypeErrorKind::Mismatched {
                    message: format!("invalid argument for sum (type {})", body),
                },
            ),
            "reduce" => match init {
                Some(init) => body.lub(&init),
                None => body,
            },
            _ => Nature::unknown(),
        }
    }

    // ========================================================================
    // Result
    // ========================================================================

    fn expect_result(&mut self, ast: &Ast, root: NodeId, nature: &Nature) {
        if nature.is_unknown() {
            return;
        }
        let (ok, expected) = match self.options.expect {
            Expect::Any => return,
            Expect::Bool => (nature.is_bool(), "bool".to_string()),
            Expect::Int | Expect::Int64 | Expect::Float64 => {
                (nature.is_number(), "number".to_string())
            }
            Expect::String => (nature.is_string(), "string".to_string()),
            Expect::Kind(kind) => (nature.is(kind), kind.to_string()),
        };
        if !ok {
            self.errors.push(TypeError::new(
                TypeErrorKind::UnexpectedResult {
                    expected,
                    found: nature.to_string(),
                },
                ast.span(root).clone(),
            ));
        }
    }
}
