//! Lowering of checked trees into VM bytecode.
//!
//! [`compile`] walks the tree once, emitting one instruction per operation
//! with the span it came from. Forward jumps are patched once their target
//! is known; every `?.` inside a chain jumps to the chain's end.

mod bytecode;
mod error;


pub use bytecode::compile;
pub use error::{CompileError, CompileErrorKind};
