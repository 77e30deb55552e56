//! Java target model: the syntax tree produced by lowering, its canonical
//! printer, and the structural equivalence oracle built on top of it.

pub mod ast;
pub mod oracle;
pub mod printer;

pub use oracle::{compare, equivalent, Mismatch};
pub use printer::JavaPrinter;
