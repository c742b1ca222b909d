//! Public API of the expression engine.
//!
//! The free functions cover one-off use:
//!
//! ```
//! use exprel_core::api::{self, CompilationOptions, MapEnv};
//! use exprel_core::values::Value;
//!
//! let env = MapEnv::new().with("Price", 120).with("Limit", 100);
//! let options = CompilationOptions::default().env(env.clone());
//! let program = api::compile("Price > Limit ? 'over' : 'ok'", &options).unwrap();
//! assert_eq!(api::run(&program, &env).unwrap(), Value::string("over"));
//! ```
//!
//! [`Engine`] keeps an environment and default options around and hands out
//! [`CompiledExpression`]s that can be run many times, from many threads.

pub mod engine;
pub mod environment;
pub mod error;
pub mod expression;
pub mod options;

use std::sync::Arc;

use tracing::debug;

pub use engine::Engine;
pub use environment::{Environment, EnvironmentBuilder, MapEnv, Schema};
pub use error::{Diagnostic, Error, ErrorKind, RelatedInfo, Severity};
pub use expression::CompiledExpression;
pub use options::{
    CancellationToken, CompilationOptions, DEFAULT_CHECK_INTERVAL, EngineOptions,
    ExecutionOptions, Expect, PatchFactory, Timezone,
};

use crate::diagnostics::Source;
use crate::values::Value;
use crate::vm::Program;
use crate::{analyzer, compiler, optimizer, parser, visitor};

/// Parses, checks, optimizes and compiles `source`.
///
/// The first failing stage decides the error; the checker reports every
/// problem it found.
pub fn compile(source: &str, options: &CompilationOptions) -> Result<Program, Error> {
    let src = Arc::new(Source::new(source));
    let mut ast = parser::parse_with_max_depth(source, options.max_depth)
        .map_err(|err| Error::from_parse(err, &src))?;
    debug!(nodes = ast.len(), "parsed");

    for factory in &options.patches {
        let mut patch = factory();
        let root = ast.root();
        visitor::walk(&mut ast, root, &mut *patch);
    }

    analyzer::check(&mut ast, options).map_err(|errors| Error::from_type_errors(errors, &src))?;
    if options.optimize {
        optimizer::optimize(&mut ast, options).map_err(|err| Error::from_compile(err, &src))?;
    }
    compiler::compile(&ast, options, &src).map_err(|err| Error::from_compile(err, &src))
}

/// Runs `program` against `env` with default execution options.
pub fn run(program: &Program, env: &dyn Environment) -> Result<Value, Error> {
    run_with(program, env, &ExecutionOptions::default())
}

pub fn run_with(
    program: &Program,
    env: &dyn Environment,
    options: &ExecutionOptions,
) -> Result<Value, Error> {
    crate::vm::run(program, env, options)
        .map_err(|err| Error::from_execution(err, program.source()))
}

/// Compiles `source` against `env` and runs it once.
///
/// ```
/// use exprel_core::api::{eval, MapEnv};
/// use exprel_core::values::Value;
///
/// let env = MapEnv::new().with("xs", Value::array([1, 2, 3].map(Value::Int)));
/// assert_eq!(eval("sum(xs) * 2", env).unwrap(), Value::Int(12));
/// ```
pub fn eval(source: &str, env: impl Environment + 'static) -> Result<Value, Error> {
    let env: Arc<dyn Environment> = Arc::new(env);
    let options = CompilationOptions::default().shared_env(env.clone());
    let program = compile(source, &options)?;
    run(&program, env.as_ref())
}

/// Restores a program written by [`Program::to_bytes`], relinking host
/// functions from `options.functions`.
pub fn load(bytes: &[u8], options: &CompilationOptions) -> Result<Program, Error> {
    let mut program = Program::from_bytes(bytes).map_err(Error::from_persist)?;
    program
        .link_functions(|name| options.functions.get(name).cloned())
        .map_err(Error::from_persist)?;
    Ok(program)
}
