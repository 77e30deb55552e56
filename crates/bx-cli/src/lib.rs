//! Library half of the `bxc` command-line transpiler.
//!
//! The binary in `src/bin/bxc.rs` only parses arguments, installs logging and
//! dispatches into [`commands`]; everything it does is reachable from here.

pub mod cli;
pub mod commands;
pub mod diagnostics;
pub mod pipeline;
pub mod sources;

pub mod error {
    use std::path::PathBuf;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("failed to read {}: {source}", path.display())]
        Read {
            path: PathBuf,
            source: std::io::Error,
        },

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Invalid input: {0}")]
        InvalidInput(String),

        #[error("{failed} of {total} files failed")]
        Failed { failed: usize, total: usize },

        #[error(transparent)]
        Core(#[from] bx_core::Error),

        #[error(transparent)]
        Json(#[from] serde_json::Error),
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};
