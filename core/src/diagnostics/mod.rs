//! Source tracking, locations and pointed error snippets.
//!
//! Every later phase reports errors against a [`Span`] (byte range). The
//! [`Source`] converts spans into human [`Location`]s and renders the
//! classic `| line` / `| ...^` snippet through [`Located`].

pub mod context;
mod located;
mod source;

pub use located::Located;
pub use source::{Location, Source, Span};
