//! Bytecode virtual machine.
//!
//! A [`Program`] holds the instructions, constant pool and source map the
//! compiler produced. [`Vm`] executes it against an environment; any
//! failure comes back as an [`ExecutionError`] pointing at the source of
//! the faulting instruction.

mod error;
mod instruction_set;
mod memory;
mod program;
mod runtime;
mod scope;
mod stack;

pub use error::{ExecutionError, RuntimeError};
pub use instruction_set::{Instruction, InvalidInstruction, slot};
pub use memory::{DEFAULT_MEMORY_BUDGET, Memory};
pub use program::{Constant, MAGIC, PersistError, Program, VERSION};
pub use runtime::{Vm, run};
pub(crate) use stack::Stack;
