//! Code checking and validation command implementation

use std::path::PathBuf;

use bx_core::diagnostics::Diagnostic;
use bx_core::source::SourceFile;
use bx_core::span::FileId;
use clap::Args;
use tracing::info;

use crate::cli::CliConfig;
use crate::diagnostics::report;
use crate::pipeline::{Overrides, Pipeline};
use crate::sources::{collect_sources, read_source};
use crate::{CliError, Result};

/// Arguments for the check command
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Files or directories to check
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,
}

/// Parses and lowers every input without writing anything. All failures
/// are collected and reported before the command fails.
pub fn check_command(args: CheckArgs, config: &CliConfig) -> Result<()> {
    let pipeline = Pipeline::new(config, &Overrides::default())?;
    let files = collect_sources(&args.paths, pipeline.frontend())?;

    let mut failures: Vec<(SourceFile, Vec<Diagnostic>)> = Vec::new();
    for (index, path) in files.iter().enumerate() {
        let source = read_source(index as FileId, path)?;
        match pipeline.transpile(&source) {
            Ok(out) => info!(file = %source.name, class = %out.class_name, "ok"),
            Err(diagnostics) => failures.push((source, diagnostics)),
        }
    }

    for (source, diagnostics) in &failures {
        report(diagnostics, source, config.diagnostics.style);
    }
    if failures.is_empty() {
        eprintln!("checked {} files", files.len());
        return Ok(());
    }
    Err(CliError::Failed {
        failed: failures.len(),
        total: files.len(),
    })
}
