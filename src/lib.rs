//! exprel - an embeddable expression engine
//!
//! # Overview
//!
//! exprel evaluates small, side-effect-free expressions against data the
//! host provides. Common use cases include:
//!
//! - Pricing and routing rules
//! - Feature flags and conditional logic
//! - Filters over collections
//! - Business rules engines
//!
//! Expressions are checked against the environment when compiled, lowered to
//! bytecode and run on a stack machine with a memory budget.
//!
//! # Quick Start
//!
//! ```
//! use exprel::{Engine, EngineOptions, Value};
//!
//! let engine = Engine::new(EngineOptions::default(), |env| {
//!     env.register("Origin", "MOW");
//!     env.register("Value", 120);
//! });
//!
//! let expr = engine.compile(r#"Origin == "MOW" && Value >= 100"#).unwrap();
//! assert_eq!(expr.run().unwrap(), Value::Bool(true));
//! ```
//!
//! # Host Functions
//!
//! ```
//! use exprel::{CompilationOptions, Function, MapEnv, Value};
//!
//! let double = Function::new("double", |args| {
//!     Ok(Value::Int(args[0].as_i64().unwrap_or(0) * 2))
//! });
//! let env = MapEnv::new().with("n", 21);
//! let options = CompilationOptions::default().env(env.clone()).function(double);
//! let program = exprel::compile("double(n)", &options).unwrap();
//! assert_eq!(exprel::run(&program, &env).unwrap(), Value::Int(42));
//! ```

pub mod error_renderer;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from exprel_core
pub use exprel_core::api::{
    CancellationToken, CompilationOptions, CompiledExpression, Diagnostic, Engine, EngineOptions,
    Environment, EnvironmentBuilder, Error, ErrorKind, ExecutionOptions, Expect, MapEnv,
    RelatedInfo, Schema, Severity, Timezone, compile, eval, load, run, run_with,
};

// Re-export commonly used types and values
pub use exprel_core::types::{self, FunctionType, StructType, Type};
pub use exprel_core::values::{self, Function, FunctionError, StructValue, TypedFn, Value};
pub use exprel_core::vm::Program;
