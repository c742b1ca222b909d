//! The interpreter loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::EcoString;
use tracing::{debug, trace};

use super::program::{Constant, Program};
use super::scope::Scope;
use super::{ExecutionError, Instruction, Memory, RuntimeError, Stack};
use crate::api::{Environment, ExecutionOptions};
use crate::builtins::{self, CallContext};
use crate::operators::{self, CastTarget};
use crate::values::{Callable, Function, Value};

/// Runs `program` on a fresh VM.
pub fn run(
    program: &Program,
    env: &dyn Environment,
    options: &ExecutionOptions,
) -> Result<Value, ExecutionError> {
    Vm::new().run(program, env, options)
}

/// Reusable interpreter state: operand stack, loop scopes, `let` slots and
/// the memory meter. One VM serves one run at a time; a [`Program`] can be
/// shared by any number of VMs.
pub struct Vm {
    stack: Stack<Value>,
    scopes: Vec<Scope>,
    vars: Vec<Value>,
    memory: Memory,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self {
            stack: Stack::new(64),
            scopes: Vec::new(),
            vars: Vec::new(),
            memory: Memory::default(),
        }
    }

    /// Memory charged by the last run.
    pub fn memory_used(&self) -> usize {
        self.memory.used()
    }

    pub fn run(
        &mut self,
        program: &Program,
        env: &dyn Environment,
        options: &ExecutionOptions,
    ) -> Result<Value, ExecutionError> {
        self.stack.clear();
        self.scopes.clear();
        self.vars.clear();
        self.vars.resize(program.variables as usize, Value::Nil);
        self.memory = Memory::new(options.memory_budget);

        debug!(instructions = program.bytecode.len(), "vm run");
        let mut pc = 0;
        let result = self.execute(program, env, options, &mut pc);

        self.scopes.clear();
        self.vars.clear();
        self.stack.clear();

        result.map_err(|kind| {
            debug!(pc, error = %kind, "vm fault");
            ExecutionError {
                kind,
                span: program.span(pc),
                location: program.location(pc),
            }
        })
    }

    fn execute(
        &mut self,
        program: &Program,
        env: &dyn Environment,
        options: &ExecutionOptions,
        pc: &mut usize,
    ) -> Result<Value, RuntimeError> {
        use Instruction::*;

        let code = &program.bytecode;
        let interval = options.check_interval.max(1);
        let mut since_check = 0u32;

        while let Some(&instruction) = code.get(*pc) {
            let mut next = *pc + 1;

            if let Some(token) = &options.cancellation {
                since_check += 1;
                if since_check >= interval {
                    since_check = 0;
                    if token.is_cancelled() {
                        return Err(RuntimeError::Cancelled);
                    }
                }
            }

            match instruction {
                Push(index) => match constant(program, index)? {
                    Constant::Value(value) => self.stack.push(value.clone()),
                    other => return Err(unexpected(other, "value")),
                },
                Int(value) => self.stack.push(Value::Int(value.into())),
                Pop => {
                    self.stack.pop()?;
                }
                True => self.stack.push(Value::Bool(true)),
                False => self.stack.push(Value::Bool(false)),
                Nil => self.stack.push(Value::Nil),

                FetchEnv(index) => match constant(program, index)? {
                    Constant::Value(Value::String(name)) => {
                        self.stack.push(env.lookup(name).unwrap_or(Value::Nil));
                    }
                    other => return Err(unexpected(other, "name")),
                },
                LoadField(index) => match constant(program, index)? {
                    Constant::Field(field) => {
                        self.stack.push(env.load_field(&field.path).unwrap_or(Value::Nil));
                    }
                    other => return Err(unexpected(other, "field")),
                },
                LoadMethod(index) => match constant(program, index)? {
                    Constant::Method(method) => {
                        let func = env.load_method(method.index).ok_or_else(|| {
                            RuntimeError::UnknownDynamicField {
                                name: method.name.to_string(),
                                ty: "environment".to_string(),
                            }
                        })?;
                        self.stack.push(Value::Func(func));
                    }
                    other => return Err(unexpected(other, "method")),
                },
                LoadFunc(index) => {
                    let func = function(constant(program, index)?)?;
                    self.stack.push(Value::Func(func));
                }
                Fetch => {
                    let (from, key) = self.stack.pop2()?;
                    self.stack.push(operators::fetch(&from, &key)?);
                }
                FetchField(index) => match constant(program, index)? {
                    Constant::Field(field) => {
                        let from = self.stack.pop()?;
                        self.stack
                            .push(operators::fetch_field(&from, &field.path, &field.name)?);
                    }
                    other => return Err(unexpected(other, "field")),
                },
                BindMethod(index) => match constant(program, index)? {
                    Constant::Method(method) => {
                        let receiver = self.stack.pop()?;
                        self.stack.push(operators::bind_method(
                            &receiver,
                            method.index,
                            &method.name,
                        )?);
                    }
                    other => return Err(unexpected(other, "method")),
                },
                Deref => {
                    let value = self.stack.pop()?;
                    self.stack.push(value.deref_all().clone());
                }
                LoadVar(slot) => {
                    let value = self
                        .vars
                        .get(slot as usize)
                        .cloned()
                        .ok_or_else(|| RuntimeError::internal(format!("no variable slot {}", slot)))?;
                    self.stack.push(value);
                }
                StoreVar(slot) => {
                    let value = self.stack.pop()?;
                    let target = self
                        .vars
                        .get_mut(slot as usize)
                        .ok_or_else(|| RuntimeError::internal(format!("no variable slot {}", slot)))?;
                    *target = value;
                }

                Add => self.binary(operators::add)?,
                Subtract => self.binary(operators::subtract)?,
                Multiply => self.binary(operators::multiply)?,
                Divide => self.binary(operators::divide)?,
                Modulo => self.binary(operators::modulo)?,
                Exponent => self.binary(operators::exponent)?,
                Negate => {
                    let value = self.stack.pop()?;
                    self.stack.push(operators::negate(&value)?);
                }
                Range => {
                    let (from, to) = self.stack.pop2()?;
                    self.stack.push(operators::range(&from, &to, &mut self.memory)?);
                }

                Equal => self.compare(|a, b| Ok(operators::equal(a, b)))?,
                EqualInt => self.compare(|a, b| {
                    Ok(match (a, b) {
                        (Value::Int(x), Value::Int(y)) => x == y,
                        _ => operators::equal(a, b),
                    })
                })?,
                EqualString => self.compare(|a, b| {
                    Ok(match (a, b) {
                        (Value::String(x), Value::String(y)) => x == y,
                        _ => operators::equal(a, b),
                    })
                })?,
                NotEqual => self.compare(|a, b| Ok(!operators::equal(a, b)))?,
                Less => self.compare(operators::less)?,
                More => self.compare(operators::more)?,
                LessOrEqual => self.compare(operators::less_or_equal)?,
                MoreOrEqual => self.compare(operators::more_or_equal)?,
                Not => {
                    let value = self.stack.pop()?;
                    match value.deref_all() {
                        Value::Bool(b) => self.stack.push(Value::Bool(!b)),
                        other => {
                            return Err(RuntimeError::mismatch(format!(
                                "invalid operation: !{}",
                                other.type_name()
                            )));
                        }
                    }
                }

                Contains => self.compare(operators::contains)?,
                StartsWith => self.compare(operators::starts_with)?,
                EndsWith => self.compare(operators::ends_with)?,
                Matches => self.compare(operators::matches)?,
                MatchesConst(index) => match constant(program, index)? {
                    Constant::Regex(regex) => {
                        let text = self.stack.pop()?;
                        match text.deref_all() {
                            Value::String(s) => self.stack.push(Value::Bool(regex.is_match(s))),
                            other => {
                                return Err(RuntimeError::mismatch(format!(
                                    "invalid operation: {} matches string",
                                    other.type_name()
                                )));
                            }
                        }
                    }
                    other => return Err(unexpected(other, "regex")),
                },
                In => self.compare(operators::is_in)?,
                Cast(target) => {
                    let target = CastTarget::from_u16(target)
                        .ok_or_else(|| RuntimeError::internal(format!("cast target {}", target)))?;
                    let value = self.stack.pop()?;
                    self.stack.push(operators::cast(&value, target)?);
                }

                Jump(offset) => next += offset as usize,
                JumpIfTrue(offset) => {
                    if operators::truthy(self.stack.peek()?.deref_all())? {
                        next += offset as usize;
                    }
                }
                JumpIfFalse(offset) => {
                    if !operators::truthy(self.stack.peek()?.deref_all())? {
                        next += offset as usize;
                    }
                }
                JumpIfNil(offset) => {
                    if self.stack.peek()?.deref_all().is_nil() {
                        next += offset as usize;
                    }
                }
                JumpIfNotNil(offset) => {
                    if !self.stack.peek()?.deref_all().is_nil() {
                        next += offset as usize;
                    }
                }
                JumpBackward(offset) => {
                    next = next
                        .checked_sub(offset as usize)
                        .ok_or_else(|| RuntimeError::internal("jump before program start"))?;
                    if options
                        .cancellation
                        .as_ref()
                        .is_some_and(|token| token.is_cancelled())
                    {
                        return Err(RuntimeError::Cancelled);
                    }
                }
                JumpIfEnd(offset) => {
                    if self.scope()?.at_end() {
                        next += offset as usize;
                    }
                }

                Begin | BeginReverse => {
                    let collection = self.stack.pop()?;
                    let items = match collection.deref_all() {
                        Value::Array(items) => items.clone(),
                        other => {
                            return Err(RuntimeError::mismatch(format!(
                                "cannot iterate over {}",
                                other.type_name()
                            )));
                        }
                    };
                    trace!(len = items.len(), "loop begin");
                    self.scopes
                        .push(Scope::new(items, matches!(instruction, BeginReverse)));
                }
                End => {
                    self.scopes
                        .pop()
                        .ok_or_else(|| RuntimeError::internal("no loop to end"))?;
                }
                IncrementIndex => self.scope_mut()?.advance(),
                IncrementCount => self.scope_mut()?.increment_count(),
                Pointer => {
                    let element = self.scope()?.element()?.clone();
                    self.stack.push(element);
                }
                LoadScope(slot) => {
                    let value = self.scope()?.load(slot)?;
                    self.stack.push(value);
                }
                SetAcc => {
                    let value = self.stack.pop()?;
                    self.scope_mut()?.set_acc(value);
                }
                InitAcc => self.scope_mut()?.init_acc()?,
                GroupBy => {
                    let key = self.stack.pop()?;
                    let scope = self
                        .scopes
                        .last_mut()
                        .ok_or_else(|| RuntimeError::internal("no loop to group"))?;
                    // One slot for the element, one more for a new map entry.
                    let opened = scope.group(key.deref_all())?;
                    self.memory.charge(1 + opened as usize)?;
                }
                SortBy => {
                    let key = self.stack.pop()?;
                    self.scope_mut()?.push_key(key.deref_all().clone());
                }
                Sort => {
                    let order = self.stack.pop()?;
                    let descending = match order.deref_all() {
                        Value::String(s) if s == "asc" => false,
                        Value::String(s) if s == "desc" => true,
                        other => {
                            return Err(RuntimeError::mismatch(format!(
                                "unknown order {}, use asc or desc",
                                other
                            )));
                        }
                    };
                    let scope = self
                        .scopes
                        .last_mut()
                        .ok_or_else(|| RuntimeError::internal("no loop to sort"))?;
                    self.memory.charge(scope.len())?;
                    let sorted = scope.sorted(descending)?;
                    self.stack.push(sorted);
                }

                Array => {
                    let count = self.count()?;
                    self.memory.charge(count)?;
                    let items = self.stack.pop_n(count)?;
                    self.stack.push(Value::Array(items.into_iter().collect()));
                }
                Map => {
                    let count = self.count()?;
                    self.memory.charge(count)?;
                    let items = self.stack.pop_n(count * 2)?;
                    let mut map = BTreeMap::new();
                    let mut items = items.into_iter();
                    while let (Some(key), Some(value)) = (items.next(), items.next()) {
                        map.insert(map_key(&key), value);
                    }
                    self.stack.push(Value::Map(Arc::new(map)));
                }
                Slice => {
                    let to = self.stack.pop()?;
                    let (array, from) = self.stack.pop2()?;
                    let from = (!from.is_nil()).then_some(&from);
                    let to = (!to.is_nil()).then_some(&to);
                    self.stack.push(operators::slice(&array, from, to)?);
                }
                Len => {
                    let value = self.stack.pop()?;
                    let len = value.len().ok_or_else(|| {
                        RuntimeError::mismatch(format!(
                            "invalid argument for len (type {})",
                            value.type_name()
                        ))
                    })?;
                    self.stack.push(Value::Int(len as i64));
                }

                Call(argc) => {
                    let callee = self.stack.pop()?;
                    let args = self.stack.pop_n(argc as usize)?;
                    let result = self.call(program, &callee, &args, true)?;
                    self.stack.push(result);
                }
                CallFast(argc) => {
                    let callee = self.stack.pop()?;
                    let args = self.stack.pop_n(argc as usize)?;
                    let result = self.call(program, &callee, &args, false)?;
                    self.stack.push(result);
                }
                CallTyped(signature) => {
                    let callee = self.stack.pop()?;
                    let result = match callee.deref_all() {
                        Value::Func(Function {
                            typed: Some(typed), ..
                        }) if typed.signature() == signature => typed.invoke(),
                        _ => self.call(program, &callee, &[], true)?,
                    };
                    self.stack.push(result);
                }
            }

            *pc = next;
        }

        let result = self.stack.pop()?;
        if !self.stack.is_empty() {
            return Err(RuntimeError::internal(format!(
                "{} values left on the stack",
                self.stack.len()
            )));
        }
        debug!(memory = self.memory.used(), "vm done");
        Ok(result)
    }

    fn binary(
        &mut self,
        op: fn(&Value, &Value) -> Result<Value, RuntimeError>,
    ) -> Result<(), RuntimeError> {
        let (a, b) = self.stack.pop2()?;
        self.stack.push(op(a.deref_all(), b.deref_all())?);
        Ok(())
    }

    fn compare<F>(&mut self, op: F) -> Result<(), RuntimeError>
    where
        F: Fn(&Value, &Value) -> Result<bool, RuntimeError>,
    {
        let (a, b) = self.stack.pop2()?;
        self.stack.push(Value::Bool(op(a.deref_all(), b.deref_all())?));
        Ok(())
    }

    /// Pops the element count of an `Array` or `Map` instruction.
    fn count(&mut self) -> Result<usize, RuntimeError> {
        match self.stack.pop()? {
            Value::Int(n) if n >= 0 => Ok(n as usize),
            other => Err(RuntimeError::internal(format!("bad element count {}", other))),
        }
    }

    fn scope(&self) -> Result<&Scope, RuntimeError> {
        self.scopes
            .last()
            .ok_or_else(|| RuntimeError::internal("not inside a loop"))
    }

    fn scope_mut(&mut self) -> Result<&mut Scope, RuntimeError> {
        self.scopes
            .last_mut()
            .ok_or_else(|| RuntimeError::internal("not inside a loop"))
    }

    fn call(
        &mut self,
        program: &Program,
        callee: &Value,
        args: &[Value],
        check_arity: bool,
    ) -> Result<Value, RuntimeError> {
        let func = match callee.deref_all() {
            Value::Func(func) => func,
            other => {
                return Err(RuntimeError::NotAFunction {
                    ty: other.type_name().to_string(),
                });
            }
        };
        if check_arity
            && !func.types.is_empty()
            && !func.types.iter().any(|ty| ty.accepts_count(args.len()))
        {
            return Err(RuntimeError::Arity {
                name: func.name.to_string(),
                too_many: func
                    .types
                    .iter()
                    .all(|ty| !ty.variadic && args.len() > ty.params.len()),
            });
        }
        trace!(name = %func.name, argc = args.len(), "call");
        let host = |err: crate::values::FunctionError| RuntimeError::Host {
            name: func.name.to_string(),
            message: err.message,
        };
        match &func.callable {
            Callable::Native(native) => native(args).map_err(host),
            Callable::Bound { receiver, imp } => imp(receiver, args).map_err(host),
            Callable::Builtin(builtin) => {
                let mut cx = CallContext {
                    memory: &mut self.memory,
                    timezone: &program.timezone,
                };
                builtin(&mut cx, args)
            }
        }
    }
}

fn constant(program: &Program, index: u16) -> Result<&Constant, RuntimeError> {
    program
        .constants
        .get(index as usize)
        .ok_or_else(|| RuntimeError::internal(format!("no constant {}", index)))
}

fn unexpected(constant: &Constant, wanted: &str) -> RuntimeError {
    RuntimeError::internal(format!("expected {} constant, got {}", wanted, constant))
}

fn function(constant: &Constant) -> Result<Function, RuntimeError> {
    match constant {
        Constant::Function(func) => Ok(func.clone()),
        Constant::Builtin(index) => builtins::get(*index)
            .and_then(|builtin| Some(Function::builtin(builtin.name, builtin.func()?)))
            .ok_or_else(|| RuntimeError::internal(format!("builtin #{} is not callable", index))),
        Constant::Unlinked(name) => Err(RuntimeError::internal(format!(
            "function {} was not relinked",
            name
        ))),
        other => Err(unexpected(other, "function")),
    }
}

fn map_key(key: &Value) -> EcoString {
    match key.deref_all() {
        Value::String(s) => s.clone(),
        other => other.to_plain_string().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CancellationToken, MapEnv, Timezone};
    use crate::diagnostics::{Location, Source, Span};
    use crate::values::FunctionError;
    use crate::vm::slot;
    use pretty_assertions::assert_eq;
    use Instruction::*;

    fn program(bytecode: Vec<Instruction>, constants: Vec<Constant>) -> Program {
        let spans = (0..bytecode.len()).map(|i| Span::new(i, i + 1)).collect();
        Program::new(
            Arc::new(Source::new("0123456789abcdefghijklmnopqrstuvwxyz")),
            bytecode,
            spans,
            constants,
            2,
            Timezone::Utc,
        )
    }

    fn exec(bytecode: Vec<Instruction>, constants: Vec<Constant>) -> Result<Value, ExecutionError> {
        run(&program(bytecode, constants), &MapEnv::new(), &ExecutionOptions::default())
    }

    fn value(v: impl Into<Value>) -> Constant {
        Constant::Value(v.into())
    }

    #[test]
    fn test_arithmetic() {
        let result = exec(vec![Int(2), Int(3), Add, Int(4), Multiply], vec![]);
        assert_eq!(result, Ok(Value::Int(20)));
    }

    #[test]
    fn test_error_is_bound_to_faulting_instruction() {
        let err = exec(vec![Int(1), Int(0), Modulo], vec![]).unwrap_err();
        assert_eq!(err.kind, RuntimeError::DivideByZero);
        assert_eq!(err.span, Span::new(2, 3));
        assert_eq!(err.location, Location::new(1, 2));
    }

    #[test]
    fn test_env_lookup_and_missing_names() {
        let env = MapEnv::new().with("Price", Value::Int(15));
        let p = program(
            vec![FetchEnv(0), Int(10), More, FetchEnv(1), Pop],
            vec![value("Price"), value("missing")],
        );
        assert_eq!(run(&p, &env, &ExecutionOptions::default()), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_short_circuit_skips_right_operand() {
        // false && (1 % 0 == 0)
        let result = exec(
            vec![False, JumpIfFalse(6), Pop, Int(1), Int(0), Modulo, Int(0), Equal],
            vec![],
        );
        assert_eq!(result, Ok(Value::Bool(false)));
    }

    #[test]
    fn test_condition_must_be_bool() {
        let err = exec(vec![Int(1), JumpIfFalse(1), Pop], vec![]).unwrap_err();
        assert_eq!(
            err.kind,
            RuntimeError::mismatch("non-bool value (type int) used as condition")
        );
    }

    #[test]
    fn test_variables() {
        let result = exec(vec![Int(7), StoreVar(1), LoadVar(1), LoadVar(1), Add], vec![]);
        assert_eq!(result, Ok(Value::Int(14)));
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// `filter(xs, # > 1)`
    fn filter_program() -> Vec<Instruction> {
        vec![
            Push(0),
            Begin,
            JumpIfEnd(11),
            Pointer,
            Int(1),
            More,
            JumpIfFalse(4),
            Pop,
            IncrementCount,
            Pointer,
            Jump(1),
            Pop,
            IncrementIndex,
            JumpBackward(12),
            LoadScope(slot::COUNT),
            End,
            Array,
        ]
    }

    #[test]
    fn test_filter_loop() {
        let xs = Value::array([1, 2, 3].map(Value::from));
        let result = exec(filter_program(), vec![Constant::Value(xs)]);
        assert_eq!(result, Ok(Value::array([2, 3].map(Value::from))));
    }

    #[test]
    fn test_loop_over_non_array() {
        let err = exec(filter_program(), vec![value(1)]).unwrap_err();
        assert_eq!(err.kind, RuntimeError::mismatch("cannot iterate over int"));
    }

    #[test]
    fn test_find_last_index() {
        // findLastIndex(xs, # == 2)
        let xs = Value::array([2, 1, 2, 3].map(Value::from));
        let code = vec![
            Push(0),
            BeginReverse,
            JumpIfEnd(7),
            Pointer,
            Int(2),
            Equal,
            JumpIfTrue(5),
            Pop,
            IncrementIndex,
            JumpBackward(8),
            Push(1),
            Jump(2),
            Pop,
            LoadScope(slot::INDEX),
            End,
        ];
        let result = exec(code, vec![Constant::Value(xs), value(-1)]);
        assert_eq!(result, Ok(Value::Int(2)));
    }

    #[test]
    fn test_sort_by_descending() {
        let xs = Value::array(["bb", "a", "ccc"].map(Value::from));
        let len = Function::builtin("len", |_, args| {
            Ok(Value::Int(args[0].len().unwrap_or(0) as i64))
        });
        let code = vec![
            Push(1),
            Push(0),
            Begin,
            JumpIfEnd(6),
            Pointer,
            LoadFunc(2),
            Call(1),
            SortBy,
            IncrementIndex,
            JumpBackward(7),
            Sort,
            End,
        ];
        let result = exec(code, vec![Constant::Value(xs), value("desc"), Constant::Function(len)]);
        assert_eq!(result, Ok(Value::array(["ccc", "bb", "a"].map(Value::from))));
    }

    #[test]
    fn test_reduce_without_initial_value() {
        // reduce(xs, #acc + #)
        let xs = Value::array([1, 2, 3, 4].map(Value::from));
        let code = vec![
            Push(0),
            Begin,
            InitAcc,
            JumpIfEnd(6),
            LoadScope(slot::ACC),
            Pointer,
            Add,
            SetAcc,
            IncrementIndex,
            JumpBackward(7),
            LoadScope(slot::ACC),
            End,
        ];
        assert_eq!(exec(code.clone(), vec![Constant::Value(xs)]), Ok(Value::Int(10)));

        let err = exec(code, vec![Constant::Value(Value::array([]))]).unwrap_err();
        assert_eq!(err.span, Span::new(2, 3));
    }

    // ========================================================================
    // Containers and resources
    // ========================================================================

    #[test]
    fn test_map_literal_renders_keys() {
        let result = exec(vec![Push(0), Int(1), Int(1), Int(2), Int(2), Map], vec![value("a")]);
        assert_eq!(
            result,
            Ok(Value::map([("1", Value::Int(2)), ("a", Value::Int(1))]))
        );
    }

    #[test]
    fn test_memory_budget() {
        let p = program(vec![Int(1), Int(100), Range], vec![]);
        let options = ExecutionOptions {
            memory_budget: 10,
            ..Default::default()
        };
        let err = run(&p, &MapEnv::new(), &options).unwrap_err();
        assert_eq!(err.kind, RuntimeError::MemoryBudgetExceeded);
        assert_eq!(err.location, Location::new(1, 2));

        let mut vm = Vm::new();
        let ok = vm.run(&p, &MapEnv::new(), &ExecutionOptions::default());
        assert!(matches!(ok, Ok(Value::Array(items)) if items.len() == 100));
        assert_eq!(vm.memory_used(), 100);
    }

    #[test]
    fn test_cancelled_run_stops() {
        // An endless loop: `JumpBackward` onto itself.
        let p = program(vec![Int(1), Pop, JumpBackward(3)], vec![]);
        let token = CancellationToken::new();
        token.cancel();
        let options = ExecutionOptions {
            cancellation: Some(token),
            ..Default::default()
        };
        let err = run(&p, &MapEnv::new(), &options).unwrap_err();
        assert_eq!(err.kind, RuntimeError::Cancelled);
    }

    #[test]
    fn test_slice_with_open_bounds() {
        let xs = Value::array([1, 2, 3].map(Value::from));
        let result = exec(vec![Push(0), Int(1), Nil, Slice], vec![Constant::Value(xs)]);
        assert_eq!(result, Ok(Value::array([2, 3].map(Value::from))));
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn add_fn() -> Function {
        use crate::types::{FunctionType, IntKind, Type};
        let int = Type::Int(IntKind::Int);
        Function::new("add", |args: &[Value]| {
            let sum = args.iter().filter_map(Value::as_i64).sum::<i64>();
            if sum < 0 {
                return Err(FunctionError::new("negative sum"));
            }
            Ok(Value::Int(sum))
        })
        .with_type(FunctionType::new(vec![int.clone(), int.clone()], int))
    }

    #[test]
    fn test_host_call() {
        let result = exec(vec![Int(1), Int(2), LoadFunc(0), Call(2)], vec![Constant::Function(add_fn())]);
        assert_eq!(result, Ok(Value::Int(3)));
    }

    #[test]
    fn test_host_error_keeps_message() {
        let err = exec(
            vec![Push(1), Int(2), LoadFunc(0), Call(2)],
            vec![Constant::Function(add_fn()), value(-5)],
        )
        .unwrap_err();
        assert_eq!(
            err.kind,
            RuntimeError::Host {
                name: "add".to_string(),
                message: "negative sum".to_string()
            }
        );
    }

    #[test]
    fn test_arity_is_checked() {
        let err = exec(
            vec![Int(1), Int(2), Int(3), LoadFunc(0), Call(3)],
            vec![Constant::Function(add_fn())],
        )
        .unwrap_err();
        assert_eq!(err.kind.to_string(), "too many arguments to call add");
    }

    #[test]
    fn test_calling_a_non_function() {
        let err = exec(vec![Int(1), Call(0)], vec![]).unwrap_err();
        assert_eq!(err.kind, RuntimeError::NotAFunction { ty: "int".to_string() });
    }

    #[test]
    fn test_typed_call_and_fallback() {
        use crate::values::TypedFn;
        let answer = Function::typed("answer", TypedFn::Int(Arc::new(|| 42_i64)));
        let result = exec(vec![LoadFunc(0), CallTyped(1)], vec![Constant::Function(answer.clone())]);
        assert_eq!(result, Ok(Value::Int(42)));
        // A mismatched signature index goes through the generic path.
        let result = exec(vec![LoadFunc(0), CallTyped(6)], vec![Constant::Function(answer)]);
        assert_eq!(result, Ok(Value::Int(42)));
    }

    #[test]
    fn test_builtin_call() {
        let (upper, _) = builtins::lookup("upper").unwrap();
        let result = exec(
            vec![Push(0), LoadFunc(1), Call(1)],
            vec![value("abc"), Constant::Builtin(upper)],
        );
        assert_eq!(result, Ok(Value::string("ABC")));
    }
}
