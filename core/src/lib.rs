//! Core of the exprel expression engine.
//!
//! Source text flows through [`parser`] (lexer and Pratt parser) into an
//! [`ast::Ast`], gets a [`analyzer::Nature`] for every node from the checker,
//! is rewritten by the [`optimizer`], lowered by the [`compiler`] into a
//! [`vm::Program`] and finally executed by the stack machine in [`vm`].
//! The [`api`] module ties the stages together.

pub mod analyzer;
pub mod api;
pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod diagnostics;
pub mod operators;
pub mod optimizer;
pub mod parser;
pub mod types;
pub mod values;
pub mod visitor;
pub mod vm;

pub use api::{compile, eval, run};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_folding() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
