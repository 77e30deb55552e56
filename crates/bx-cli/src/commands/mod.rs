//! Command implementations for the `bxc` CLI

pub mod check;
pub mod parse;
pub mod transpile;

pub use check::check_command;
pub use parse::parse_command;
pub use transpile::transpile_command;

use clap::ValueEnum;

/// `--resolver` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolverArg {
    Dynamic,
    Static,
    Strict,
}

impl From<ResolverArg> for bx_lower::ResolverKind {
    fn from(arg: ResolverArg) -> Self {
        match arg {
            ResolverArg::Dynamic => bx_lower::ResolverKind::Dynamic,
            ResolverArg::Static => bx_lower::ResolverKind::Static,
            ResolverArg::Strict => bx_lower::ResolverKind::Strict,
        }
    }
}
