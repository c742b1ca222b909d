//! Bytecode compiler implementation.

use std::sync::Arc;

use ecow::EcoString;
use hashbrown::HashMap;
use tracing::debug;

use super::{CompileError, CompileErrorKind};
use crate::api::{CompilationOptions, Expect};
use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, PointerKind, UnaryOp};
use crate::builtins;
use crate::diagnostics::{Source, Span};
use crate::operators::CastTarget;
use crate::types::{FieldDescriptor, FieldPath, MethodDescriptor};
use crate::values::Value;
use crate::vm::{Constant, Instruction, Program, slot};

/// Compiles a checked (and possibly optimized) tree into a [`Program`].
pub fn compile(
    ast: &Ast,
    options: &CompilationOptions,
    source: &Arc<Source>,
) -> Result<Program, CompileError> {
    let mut compiler = BytecodeCompiler::new(ast, options, source);
    let root = ast.root();
    compiler.node(root)?;
    let span = ast.span(root).clone();
    let cast = match options.expect {
        Expect::Int => Some(CastTarget::Int),
        Expect::Int64 => Some(CastTarget::Int64),
        Expect::Float64 => Some(CastTarget::Float64),
        _ => None,
    };
    if let Some(target) = cast {
        compiler.emit(Instruction::Cast(target as u16), &span);
    }
    Ok(compiler.finish())
}

/// Key under which constants are deduplicated. Arrays, maps and other
/// composite values are never shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Int(i64),
    Float(u64),
    Bool(bool),
    String(EcoString),
    Field(FieldPath, EcoString),
    Method(u16, EcoString),
    Regex(String),
    Function(EcoString),
    Builtin(u16),
}

impl ConstKey {
    fn of_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Int(v) => ConstKey::Int(*v),
            Value::Float64(v) => ConstKey::Float(v.to_bits()),
            Value::Bool(b) => ConstKey::Bool(*b),
            Value::String(s) => ConstKey::String(s.clone()),
            _ => return None,
        })
    }

    fn of(constant: &Constant) -> Option<Self> {
        Some(match constant {
            Constant::Value(value) => return Self::of_value(value),
            Constant::Field(field) => ConstKey::Field(field.path.clone(), field.name.clone()),
            Constant::Method(method) => ConstKey::Method(method.index, method.name.clone()),
            Constant::Regex(regex) => ConstKey::Regex(regex.as_str().to_string()),
            Constant::Function(func) => ConstKey::Function(func.name.clone()),
            Constant::Builtin(index) => ConstKey::Builtin(*index),
            Constant::Unlinked(_) => return None,
        })
    }
}

/// Walks the tree emitting instructions, one span per instruction.
///
/// Forward jumps are emitted with a zero distance and patched once their
/// target is known. Optional chains keep a list of pending `JumpIfNil`s
/// per [`NodeKind::Chain`], patched when the chain ends.
struct BytecodeCompiler<'a> {
    ast: &'a Ast,
    options: &'a CompilationOptions,
    source: &'a Arc<Source>,

    instructions: Vec<Instruction>,
    spans: Vec<Span>,

    /// Constant pool for literals, names and descriptors
    constants: Vec<Constant>,

    /// Constant deduplication map: key -> index
    constant_map: HashMap<ConstKey, u16>,

    /// `let` names in scope with their variable slots, innermost last
    lets: Vec<(EcoString, u16)>,
    variables: u16,

    /// Pending nil jumps of the optional chains being compiled
    chains: Vec<Vec<usize>>,
}

impl<'a> BytecodeCompiler<'a> {
    fn new(ast: &'a Ast, options: &'a CompilationOptions, source: &'a Arc<Source>) -> Self {
        Self {
            ast,
            options,
            source,
            instructions: Vec::with_capacity(ast.len() * 2),
            spans: Vec::with_capacity(ast.len() * 2),
            constants: Vec::new(),
            constant_map: HashMap::new(),
            lets: Vec::new(),
            variables: 0,
            chains: Vec::new(),
        }
    }

    fn finish(self) -> Program {
        debug!(
            instructions = self.instructions.len(),
            constants = self.constants.len(),
            variables = self.variables,
            "compiled"
        );
        Program::new(
            self.source.clone(),
            self.instructions,
            self.spans,
            self.constants,
            self.variables,
            self.options.timezone,
        )
    }

    // === Instruction Emission ===

    fn emit(&mut self, instruction: Instruction, span: &Span) -> usize {
        self.instructions.push(instruction);
        self.spans.push(span.clone());
        self.instructions.len() - 1
    }

    fn emit_int(&mut self, value: i64, span: &Span) -> Result<(), CompileError> {
        match u16::try_from(value) {
            Ok(small) => {
                self.emit(Instruction::Int(small), span);
            }
            Err(_) => {
                let index = self.constant(Constant::Value(Value::Int(value)), span)?;
                self.emit(Instruction::Push(index), span);
            }
        }
        Ok(())
    }

    fn emit_value(&mut self, value: Value, span: &Span) -> Result<(), CompileError> {
        let index = self.constant(Constant::Value(value), span)?;
        self.emit(Instruction::Push(index), span);
        Ok(())
    }

    /// Adds a constant, reusing an equal one already in the pool.
    fn constant(&mut self, constant: Constant, span: &Span) -> Result<u16, CompileError> {
        let key = ConstKey::of(&constant);
        if let Some(index) = key.as_ref().and_then(|k| self.constant_map.get(k)) {
            return Ok(*index);
        }
        let index = u16::try_from(self.constants.len())
            .map_err(|_| CompileError::new(CompileErrorKind::TooManyConstants, span.clone()))?;
        self.constants.push(constant);
        if let Some(key) = key {
            self.constant_map.insert(key, index);
        }
        Ok(index)
    }

    /// Emits a forward jump to be patched with [`Self::patch`].
    fn emit_jump(&mut self, jump: Instruction, span: &Span) -> usize {
        self.emit(jump, span)
    }

    /// Points the jump at `at` to the next instruction to be emitted.
    fn patch(&mut self, at: usize) -> Result<(), CompileError> {
        let distance = self.instructions.len() - at - 1;
        let distance = u16::try_from(distance).map_err(|_| self.too_far(at))?;
        self.instructions[at] = self.instructions[at].with_operand(distance);
        Ok(())
    }

    /// Emits a `JumpBackward` landing on `target`.
    fn emit_backward(&mut self, target: usize, span: &Span) -> Result<(), CompileError> {
        let distance = self.instructions.len() + 1 - target;
        let distance = u16::try_from(distance).map_err(|_| self.too_far(target))?;
        self.emit(Instruction::JumpBackward(distance), span);
        Ok(())
    }

    fn too_far(&self, at: usize) -> CompileError {
        CompileError::new(
            CompileErrorKind::JumpTooFar,
            self.spans.get(at).cloned().unwrap_or_default(),
        )
    }

    // === Nodes ===

    fn node(&mut self, id: NodeId) -> Result<(), CompileError> {
        let ast = self.ast;
        let span = ast.span(id);
        match ast.kind(id) {
            NodeKind::Nil => {
                self.emit(Instruction::Nil, span);
            }
            NodeKind::Bool(true) => {
                self.emit(Instruction::True, span);
            }
            NodeKind::Bool(false) => {
                self.emit(Instruction::False, span);
            }
            NodeKind::Integer(v) => self.emit_int(*v, span)?,
            NodeKind::Float(v) => self.emit_value(Value::Float64(*v), span)?,
            NodeKind::String(s) => self.emit_value(Value::String(s.clone()), span)?,
            NodeKind::Constant(value) => self.emit_value(value.clone(), span)?,
            NodeKind::Identifier {
                name,
                field,
                method,
                deref,
            } => self.identifier(name, field.as_ref(), *method, *deref, span)?,
            NodeKind::Pointer(kind) => {
                let instruction = match kind {
                    PointerKind::Element => Instruction::Pointer,
                    PointerKind::Index => Instruction::LoadScope(slot::INDEX),
                    PointerKind::Acc => Instruction::LoadScope(slot::ACC),
                };
                self.emit(instruction, span);
            }
            NodeKind::Unary { op, operand } => {
                self.node(*operand)?;
                match op {
                    UnaryOp::Not => {
                        self.emit(Instruction::Not, span);
                    }
                    UnaryOp::Negate => {
                        self.emit(Instruction::Negate, span);
                    }
                    UnaryOp::Plus => {}
                }
            }
            NodeKind::Binary { op, left, right } => self.binary(id, *op, *left, *right)?,
            NodeKind::Matches { left, right, regex } => {
                self.node(*left)?;
                let op_span = self.ast.operator_span(id).clone();
                match regex {
                    Some(regex) => {
                        let index = self.constant(Constant::Regex(regex.clone()), span)?;
                        self.emit(Instruction::MatchesConst(index), &op_span);
                    }
                    None => {
                        self.node(*right)?;
                        self.emit(Instruction::Matches, &op_span);
                    }
                }
            }
            NodeKind::Chain { inner } => {
                self.chains.push(Vec::new());
                self.node(*inner)?;
                for at in self.chains.pop().unwrap_or_default() {
                    self.patch(at)?;
                }
            }
            NodeKind::Member {
                object,
                property,
                optional,
                field,
                method,
            } => self.member(*object, *property, *optional, field.as_ref(), *method, span)?,
            NodeKind::Slice { array, from, to } => {
                self.node(*array)?;
                for bound in [from, to] {
                    match bound {
                        Some(bound) => self.node(*bound)?,
                        None => {
                            self.emit(Instruction::Nil, span);
                        }
                    }
                }
                self.emit(Instruction::Slice, span);
            }
            NodeKind::Call {
                callee,
                args,
                fast,
                typed,
            } => self.call(*callee, args, *fast, *typed, span)?,
            NodeKind::Builtin {
                name,
                args,
                map,
                threshold,
            } => self.builtin(name, args, *map, *threshold, span)?,
            NodeKind::Predicate { body } => self.node(*body)?,
            NodeKind::Conditional {
                cond,
                then,
                otherwise,
            } => {
                self.node(*cond)?;
                match then {
                    Some(then) => {
                        let to_else = self.emit_jump(Instruction::JumpIfFalse(0), span);
                        self.emit(Instruction::Pop, span);
                        self.node(*then)?;
                        let to_end = self.emit_jump(Instruction::Jump(0), span);
                        self.patch(to_else)?;
                        self.emit(Instruction::Pop, span);
                        self.node(*otherwise)?;
                        self.patch(to_end)?;
                    }
                    None => {
                        let to_end = self.emit_jump(Instruction::JumpIfTrue(0), span);
                        self.emit(Instruction::Pop, span);
                        self.node(*otherwise)?;
                        self.patch(to_end)?;
                    }
                }
            }
            NodeKind::Array(items) => {
                for item in items {
                    self.node(*item)?;
                }
                self.emit_int(items.len() as i64, span)?;
                self.emit(Instruction::Array, span);
            }
            NodeKind::Map(pairs) => {
                for pair in pairs {
                    self.node(*pair)?;
                }
                self.emit_int(pairs.len() as i64, span)?;
                self.emit(Instruction::Map, span);
            }
            NodeKind::Pair { key, value } => {
                self.node(*key)?;
                self.node(*value)?;
            }
            NodeKind::VariableDeclarator { name, value, body } => {
                self.node(*value)?;
                let slot = self.variables;
                self.variables = self.variables.checked_add(1).ok_or_else(|| {
                    CompileError::new(CompileErrorKind::TooManyConstants, span.clone())
                })?;
                self.emit(Instruction::StoreVar(slot), span);
                self.lets.push((name.clone(), slot));
                let result = self.node(*body);
                self.lets.pop();
                result?;
            }
        }
        Ok(())
    }

    fn identifier(
        &mut self,
        name: &EcoString,
        field: Option<&FieldPath>,
        method: Option<u16>,
        deref: bool,
        span: &Span,
    ) -> Result<(), CompileError> {
        if let Some((_, slot)) = self.lets.iter().rev().find(|(n, _)| n == name) {
            self.emit(Instruction::LoadVar(*slot), span);
            return Ok(());
        }
        if let Some(func) = self.options.functions.get(name) {
            let index = self.constant(Constant::Function(func.clone()), span)?;
            self.emit(Instruction::LoadFunc(index), span);
            return Ok(());
        }
        if let Some(path) = field {
            let descriptor = FieldDescriptor {
                path: path.clone(),
                name: name.clone(),
            };
            let index = self.constant(Constant::Field(descriptor), span)?;
            self.emit(Instruction::LoadField(index), span);
        } else if let Some(method) = method {
            let descriptor = MethodDescriptor {
                index: method,
                name: name.clone(),
            };
            let index = self.constant(Constant::Method(descriptor), span)?;
            self.emit(Instruction::LoadMethod(index), span);
        } else {
            let index = self.constant(Constant::Value(Value::String(name.clone())), span)?;
            self.emit(Instruction::FetchEnv(index), span);
        }
        if deref {
            self.emit(Instruction::Deref, span);
        }
        Ok(())
    }

    fn member(
        &mut self,
        object: NodeId,
        property: NodeId,
        optional: bool,
        field: Option<&FieldPath>,
        method: Option<u16>,
        span: &Span,
    ) -> Result<(), CompileError> {
        self.node(object)?;
        if optional {
            let jump = self.emit_jump(Instruction::JumpIfNil(0), span);
            match self.chains.last_mut() {
                Some(pending) => pending.push(jump),
                None => self.patch(jump)?,
            }
        }
        let name = match self.ast.kind(property) {
            NodeKind::String(name) => Some(name.clone()),
            _ => None,
        };
        match (field, method, name) {
            (Some(path), _, Some(name)) => {
                let descriptor = FieldDescriptor {
                    path: path.clone(),
                    name,
                };
                let index = self.constant(Constant::Field(descriptor), span)?;
                self.emit(Instruction::FetchField(index), span);
            }
            (None, Some(method), Some(name)) => {
                let descriptor = MethodDescriptor {
                    index: method,
                    name,
                };
                let index = self.constant(Constant::Method(descriptor), span)?;
                self.emit(Instruction::BindMethod(index), span);
            }
            _ => {
                self.node(property)?;
                self.emit(Instruction::Fetch, span);
            }
        }
        Ok(())
    }

    fn binary(
        &mut self,
        id: NodeId,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    ) -> Result<(), CompileError> {
        let span = self.ast.span(id);
        let short_circuit = match op {
            BinaryOp::And => Some(Instruction::JumpIfFalse(0)),
            BinaryOp::Or => Some(Instruction::JumpIfTrue(0)),
            BinaryOp::Coalesce => Some(Instruction::JumpIfNotNil(0)),
            _ => None,
        };
        if let Some(jump) = short_circuit {
            self.node(left)?;
            let to_end = self.emit_jump(jump, span);
            self.emit(Instruction::Pop, span);
            self.node(right)?;
            return self.patch(to_end);
        }

        self.node(left)?;
        self.node(right)?;
        let op_span = self.ast.operator_span(id).clone();
        let both = |check: fn(&crate::analyzer::Nature) -> bool| {
            matches!(
                (self.ast.nature(left), self.ast.nature(right)),
                (Some(l), Some(r)) if check(l) && check(r) && !l.nil && !r.nil
            )
        };
        let instruction = match op {
            BinaryOp::Equal if both(|n| n.is_integer()) => Instruction::EqualInt,
            BinaryOp::Equal if both(|n| n.is_string()) => Instruction::EqualString,
            BinaryOp::Equal => Instruction::Equal,
            BinaryOp::NotEqual => Instruction::NotEqual,
            BinaryOp::Less => Instruction::Less,
            BinaryOp::More => Instruction::More,
            BinaryOp::LessOrEqual => Instruction::LessOrEqual,
            BinaryOp::MoreOrEqual => Instruction::MoreOrEqual,
            BinaryOp::In => Instruction::In,
            BinaryOp::NotIn => {
                self.emit(Instruction::In, &op_span);
                Instruction::Not
            }
            BinaryOp::Matches => Instruction::Matches,
            BinaryOp::Contains => Instruction::Contains,
            BinaryOp::StartsWith => Instruction::StartsWith,
            BinaryOp::EndsWith => Instruction::EndsWith,
            BinaryOp::Range => Instruction::Range,
            BinaryOp::Add => Instruction::Add,
            BinaryOp::Subtract => Instruction::Subtract,
            BinaryOp::Multiply => Instruction::Multiply,
            BinaryOp::Divide => Instruction::Divide,
            BinaryOp::Modulo => Instruction::Modulo,
            BinaryOp::Exponent => Instruction::Exponent,
            BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => unreachable!(),
        };
        self.emit(instruction, &op_span);
        Ok(())
    }

    // === Calls ===

    fn call(
        &mut self,
        callee: NodeId,
        args: &[NodeId],
        fast: bool,
        typed: Option<u16>,
        span: &Span,
    ) -> Result<(), CompileError> {
        let instruction = match typed {
            Some(signature) if args.is_empty() => Instruction::CallTyped(signature),
            _ if fast => Instruction::CallFast(args.len() as u16),
            _ => Instruction::Call(args.len() as u16),
        };
        for arg in args {
            self.node(*arg)?;
        }
        if args.is_empty() || !self.on_optional_path(callee) || self.chains.is_empty() {
            self.node(callee)?;
            self.emit(instruction, span);
            return Ok(());
        }

        // `a?.f(x)`: a nil receiver must also drop the arguments already
        // pushed, so its jumps land on a pad that unwinds them.
        self.chains.push(Vec::new());
        self.node(callee)?;
        let pending = self.chains.pop().unwrap_or_default();
        let to_call = self.emit_jump(Instruction::Jump(0), span);
        for at in pending {
            self.patch(at)?;
        }
        for _ in 0..=args.len() {
            self.emit(Instruction::Pop, span);
        }
        self.emit(Instruction::Nil, span);
        let to_chain_end = self.emit_jump(Instruction::JumpIfNil(0), span);
        if let Some(outer) = self.chains.last_mut() {
            outer.push(to_chain_end);
        }
        self.patch(to_call)?;
        self.emit(instruction, span);
        Ok(())
    }

    /// Whether evaluating `id` may take a `?.` exit of the enclosing chain.
    fn on_optional_path(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::Member {
                object, optional, ..
            } => *optional || self.on_optional_path(*object),
            NodeKind::Call { callee, .. } => self.on_optional_path(*callee),
            NodeKind::Slice { array, .. } => self.on_optional_path(*array),
            _ => false,
        }
    }

    fn builtin(
        &mut self,
        name: &str,
        args: &[NodeId],
        map: Option<NodeId>,
        threshold: Option<i64>,
        span: &Span,
    ) -> Result<(), CompileError> {
        let (index, builtin) = builtins::lookup(name).ok_or_else(|| {
            CompileError::new(
                CompileErrorKind::ConstExpr {
                    name: name.to_string(),
                    message: "unknown builtin".to_string(),
                },
                span.clone(),
            )
        })?;
        if builtin.is_loop() {
            return self.loop_builtin(name, args, map, threshold, span);
        }
        for arg in args {
            self.node(*arg)?;
        }
        if name == "len" && args.len() == 1 {
            self.emit(Instruction::Len, span);
            return Ok(());
        }
        let constant = self.constant(Constant::Builtin(index), span)?;
        self.emit(Instruction::LoadFunc(constant), span);
        self.emit(Instruction::Call(args.len() as u16), span);
        Ok(())
    }

    // === Loops ===

    /// Emits `begin: JumpIfEnd(end); body; IncrementIndex; JumpBackward(begin); end:`.
    fn emit_loop<F>(&mut self, span: &Span, body: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        let begin = self.emit_jump(Instruction::JumpIfEnd(0), span);
        body(self)?;
        self.emit(Instruction::IncrementIndex, span);
        self.emit_backward(begin, span)?;
        self.patch(begin)
    }

    /// Runs `body` when the bool on top is true, consuming the bool.
    fn emit_cond<F>(&mut self, span: &Span, body: F) -> Result<(), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        let to_noop = self.emit_jump(Instruction::JumpIfFalse(0), span);
        self.emit(Instruction::Pop, span);
        body(self)?;
        let to_end = self.emit_jump(Instruction::Jump(0), span);
        self.patch(to_noop)?;
        self.emit(Instruction::Pop, span);
        self.patch(to_end)
    }

    /// Element itself, or the predicate when one was given.
    fn element_or(&mut self, predicate: Option<NodeId>, span: &Span) -> Result<(), CompileError> {
        match predicate {
            Some(predicate) => self.node(predicate),
            None => {
                self.emit(Instruction::Pointer, span);
                Ok(())
            }
        }
    }

    fn loop_builtin(
        &mut self,
        name: &str,
        args: &[NodeId],
        map: Option<NodeId>,
        threshold: Option<i64>,
        span: &Span,
    ) -> Result<(), CompileError> {
        let Some(&collection) = args.first() else {
            return Ok(());
        };
        let predicate = args.get(1).copied();
        let extra = args.get(2).copied();

        // Values the loop needs from the outer scope go first.
        match (name, extra) {
            ("sortBy", Some(order)) => self.node(order)?,
            ("sortBy", None) => self.emit_value(Value::string("asc"), span)?,
            ("reduce", Some(init)) => self.node(init)?,
            _ => {}
        }
        self.node(collection)?;
        let reverse = matches!(name, "findLast" | "findLastIndex");
        self.emit(
            if reverse {
                Instruction::BeginReverse
            } else {
                Instruction::Begin
            },
            span,
        );

        match name {
            "all" | "any" | "none" => {
                let mut breaks = Vec::new();
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    let jump = match name {
                        "all" => Instruction::JumpIfFalse(0),
                        "any" => Instruction::JumpIfTrue(0),
                        _ => {
                            c.emit(Instruction::Not, span);
                            Instruction::JumpIfFalse(0)
                        }
                    };
                    breaks.push(c.emit_jump(jump, span));
                    c.emit(Instruction::Pop, span);
                    Ok(())
                })?;
                let done = if name == "any" {
                    Instruction::False
                } else {
                    Instruction::True
                };
                self.emit(done, span);
                for at in breaks {
                    self.patch(at)?;
                }
            }
            "one" => {
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit_cond(span, |c| {
                        c.emit(Instruction::IncrementCount, span);
                        Ok(())
                    })
                })?;
                self.emit(Instruction::LoadScope(slot::COUNT), span);
                self.emit(Instruction::Int(1), span);
                self.emit(Instruction::EqualInt, span);
            }
            "filter" => {
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit_cond(span, |c| {
                        c.emit(Instruction::IncrementCount, span);
                        c.element_or(map, span)
                    })
                })?;
                self.emit(Instruction::LoadScope(slot::COUNT), span);
                self.emit(Instruction::End, span);
                self.emit(Instruction::Array, span);
                return Ok(());
            }
            "map" => {
                self.emit_loop(span, |c| c.element_or(predicate, span))?;
                self.emit(Instruction::LoadScope(slot::LEN), span);
                self.emit(Instruction::End, span);
                self.emit(Instruction::Array, span);
                return Ok(());
            }
            "count" => {
                let mut breaks = Vec::new();
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit_cond(span, |c| {
                        c.emit(Instruction::IncrementCount, span);
                        if let Some(n) = threshold {
                            c.emit(Instruction::LoadScope(slot::COUNT), span);
                            c.emit_int(n, span)?;
                            c.emit(Instruction::MoreOrEqual, span);
                            breaks.push(c.emit_jump(Instruction::JumpIfTrue(0), span));
                            c.emit(Instruction::Pop, span);
                        }
                        Ok(())
                    })
                })?;
                if !breaks.is_empty() {
                    let to_count = self.emit_jump(Instruction::Jump(0), span);
                    for at in breaks {
                        self.patch(at)?;
                    }
                    self.emit(Instruction::Pop, span);
                    self.patch(to_count)?;
                }
                self.emit(Instruction::LoadScope(slot::COUNT), span);
            }
            "sum" => {
                self.emit(Instruction::Int(0), span);
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit(Instruction::Add, span);
                    Ok(())
                })?;
            }
            "find" | "findIndex" | "findLast" | "findLastIndex" => {
                let mut found = 0;
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    found = c.emit_jump(Instruction::JumpIfTrue(0), span);
                    c.emit(Instruction::Pop, span);
                    Ok(())
                })?;
                let index = matches!(name, "findIndex" | "findLastIndex");
                if index {
                    self.emit_value(Value::Int(-1), span)?;
                } else {
                    self.emit(Instruction::Nil, span);
                }
                let to_end = self.emit_jump(Instruction::Jump(0), span);
                self.patch(found)?;
                self.emit(Instruction::Pop, span);
                self.emit(
                    if index {
                        Instruction::LoadScope(slot::INDEX)
                    } else {
                        Instruction::Pointer
                    },
                    span,
                );
                self.patch(to_end)?;
            }
            "groupBy" => {
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit(Instruction::GroupBy, span);
                    Ok(())
                })?;
                self.emit(Instruction::LoadScope(slot::GROUPS), span);
            }
            "sortBy" => {
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit(Instruction::SortBy, span);
                    Ok(())
                })?;
                self.emit(Instruction::Sort, span);
            }
            "reduce" => {
                self.emit(
                    if extra.is_some() {
                        Instruction::SetAcc
                    } else {
                        Instruction::InitAcc
                    },
                    span,
                );
                self.emit_loop(span, |c| {
                    c.element_or(predicate, span)?;
                    c.emit(Instruction::SetAcc, span);
                    Ok(())
                })?;
                self.emit(Instruction::LoadScope(slot::ACC), span);
            }
            other => {
                return Err(CompileError::new(
                    CompileErrorKind::ConstExpr {
                        name: other.to_string(),
                        message: "no loop form".to_string(),
                    },
                    span.clone(),
                ));
            }
        }
        self.emit(Instruction::End, span);
        Ok(())
    }
}
