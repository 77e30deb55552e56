//! Mode-switching tokenizer for tag and script CFML.

pub mod token;
pub mod tokenizer;
pub(crate) mod winnow;

pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::{lex, lex_with, LexError, LexErrorKind, StartMode};
