//! Source syntax tree shared by the tag and script surface forms.
//!
//! The tree is owned top-down with `Box`/`Vec`; nothing is shared, and
//! every node keeps the span it was parsed from.

mod decl;
mod expr;
mod ident;
mod stmt;
pub mod visit;

pub use decl::*;
pub use expr::*;
pub use ident::*;
pub use stmt::*;
