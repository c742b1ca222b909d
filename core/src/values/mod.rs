//! Runtime values.
//!
//! Every value the VM touches is a [`Value`]: a tagged union over the
//! primitive kinds (integer widths preserved for interop), shared strings
//! and arrays, key-ordered maps, host structs, time and duration values,
//! and callable [`Function`]s.

mod function;
mod value;

pub use function::{Callable, Function, FunctionError, NativeFn, TypedFn};
pub use value::{ConstSet, StructValue, Value, format_duration};

#[cfg(test)]
mod function_test;
#[cfg(test)]
mod value_test;
