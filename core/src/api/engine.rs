//! The compilation engine.

use std::sync::Arc;

use super::{
    CompilationOptions, CompiledExpression, EngineOptions, Environment, EnvironmentBuilder, Error,
    MapEnv,
};

/// Holds a global environment and default options, and compiles
/// expressions against them.
///
/// # Example
///
/// ```
/// use exprel_core::api::{Engine, EngineOptions};
/// use exprel_core::values::Value;
///
/// let engine = Engine::new(EngineOptions::default(), |env| {
///     env.register("pi", Value::Float64(3.14159));
///     env.function("add", |args| {
///         let a = args[0].as_i64().unwrap_or(0);
///         let b = args[1].as_i64().unwrap_or(0);
///         Ok(Value::Int(a + b))
///     });
/// });
///
/// let expr = engine.compile("add(40, 2)").unwrap();
/// assert_eq!(expr.run().unwrap(), Value::Int(42));
/// ```
pub struct Engine {
    environment: Arc<MapEnv>,
    options: EngineOptions,
}

impl Engine {
    /// Creates an engine whose globals are registered by `init`.
    pub fn new(options: EngineOptions, init: impl FnOnce(&mut EnvironmentBuilder)) -> Self {
        let mut builder = EnvironmentBuilder::new();
        init(&mut builder);
        Self {
            environment: Arc::new(builder.build()),
            options,
        }
    }

    /// The global environment.
    pub fn environment(&self) -> &MapEnv {
        &self.environment
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compiles `source` with the engine's default compilation options.
    pub fn compile(&self, source: &str) -> Result<CompiledExpression, Error> {
        self.compile_with(source, self.options.default_compilation_options.clone())
    }

    /// Compiles `source` with `options`. The engine's environment replaces
    /// any environment set on `options`.
    pub fn compile_with(
        &self,
        source: &str,
        options: CompilationOptions,
    ) -> Result<CompiledExpression, Error> {
        let env: Arc<dyn Environment> = self.environment.clone();
        let options = options.shared_env(env.clone());
        let program = super::compile(source, &options)?;
        Ok(CompiledExpression::new(
            Arc::new(program),
            env,
            self.options.default_execution_options.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ErrorKind, ExecutionOptions, Expect};
    use crate::values::Value;
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        Engine::new(EngineOptions::default(), |env| {
            env.register("Limit", 10);
            env.function("twice", |args| {
                Ok(Value::Int(args.first().and_then(Value::as_i64).unwrap_or(0) * 2))
            });
        })
    }

    #[test]
    fn test_globals_are_visible() {
        let expr = engine().compile("twice(Limit) + 1").unwrap();
        assert_eq!(expr.run().unwrap(), Value::Int(21));
    }

    #[test]
    fn test_unknown_names_fail_to_compile() {
        let err = engine().compile("Limit + Missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownName);
    }

    #[test]
    fn test_compile_with_overrides_defaults() {
        let options = CompilationOptions::default().expect(Expect::Float64);
        let expr = engine().compile_with("Limit", options).unwrap();
        assert_eq!(expr.run().unwrap(), Value::Float64(10.0));
    }

    #[test]
    fn test_default_execution_options_apply() {
        let options = EngineOptions {
            default_execution_options: ExecutionOptions {
                memory_budget: 5,
                ..Default::default()
            },
            ..Default::default()
        };
        let engine = Engine::new(options, |_| {});
        let err = engine.compile("1..100").unwrap().run().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MemoryBudgetExceeded);
    }
}
