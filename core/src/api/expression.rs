//! Compiled expressions.

use std::fmt;
use std::sync::{Arc, Mutex};

use super::{Environment, Error, ExecutionOptions};
use crate::values::Value;
use crate::vm::{Program, Vm};

/// Machines kept around between runs.
const POOL_LIMIT: usize = 8;

/// A program bound to the environment it was checked against.
///
/// The program is shared read-only; every run takes its own [`Vm`] from a
/// small pool, so one expression can be evaluated from many threads at
/// once.
///
/// # Example
///
/// ```
/// use exprel_core::api::{Engine, EngineOptions, MapEnv};
/// use exprel_core::values::Value;
///
/// let engine = Engine::new(EngineOptions::default(), |env| env.register("x", 2));
/// let expr = engine.compile("x * 21").unwrap();
/// assert_eq!(expr.run().unwrap(), Value::Int(42));
///
/// // Same shape, other values.
/// let other = MapEnv::new().with("x", 5);
/// assert_eq!(expr.run_in(&other).unwrap(), Value::Int(105));
/// ```
pub struct CompiledExpression {
    program: Arc<Program>,
    env: Arc<dyn Environment>,
    options: ExecutionOptions,
    pool: Mutex<Vec<Vm>>,
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.program.source().content())
            .field("instructions", &self.program.instructions().len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CompiledExpression {
    pub(crate) fn new(
        program: Arc<Program>,
        env: Arc<dyn Environment>,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            program,
            env,
            options,
            pool: Mutex::new(Vec::new()),
        }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Runs against the bound environment with the default options.
    pub fn run(&self) -> Result<Value, Error> {
        self.execute(self.env.as_ref(), &self.options)
    }

    /// Runs against the bound environment with other execution options.
    pub fn run_with(&self, options: &ExecutionOptions) -> Result<Value, Error> {
        self.execute(self.env.as_ref(), options)
    }

    /// Runs against another environment of the same shape, such as the
    /// values behind a [`Schema`](super::Schema) the expression was
    /// checked with.
    pub fn run_in(&self, env: &dyn Environment) -> Result<Value, Error> {
        self.execute(env, &self.options)
    }

    fn execute(&self, env: &dyn Environment, options: &ExecutionOptions) -> Result<Value, Error> {
        let mut vm = self
            .pool
            .lock()
            .ok()
            .and_then(|mut pool| pool.pop())
            .unwrap_or_default();
        let result = vm.run(&self.program, env, options);
        if let Ok(mut pool) = self.pool.lock()
            && pool.len() < POOL_LIMIT
        {
            pool.push(vm);
        }
        result.map_err(|err| Error::from_execution(err, self.program.source()))
    }
}
