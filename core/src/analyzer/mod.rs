//! Static checking: assigns a [`Nature`] to every node of the tree and
//! reports type errors before any code is generated.

mod checker;
mod error;
mod nature;


pub use checker::check;
pub(crate) use checker::{find_overload, operator_result, rewrite_overload};
pub use error::{TypeError, TypeErrorKind};
pub use nature::{FuncInfo, Nature};
