pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod pretty;
pub mod source;
pub mod span;
pub mod stack;

pub use error::{Error, Result};
