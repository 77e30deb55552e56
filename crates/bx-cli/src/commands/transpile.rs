//! `bxc transpile`: CFML sources to Java files.

use std::fs;
use std::path::{Path, PathBuf};

use bx_core::span::FileId;
use clap::Args;
use tracing::{info, warn};

use super::ResolverArg;
use crate::cli::CliConfig;
use crate::diagnostics::report;
use crate::pipeline::{Overrides, Pipeline};
use crate::sources::{collect_sources, read_source};
use crate::{CliError, Result};

/// Arguments for the transpile command
#[derive(Debug, Clone, Args)]
pub struct TranspileArgs {
    /// Source files or directories
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory for the generated `<Class>.java` files; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Package declared by the generated files
    #[arg(long)]
    pub package: Option<String>,

    /// How unbound names are lowered
    #[arg(long, value_enum)]
    pub resolver: Option<ResolverArg>,

    /// Emit Javadoc from `hint` attributes
    #[arg(long)]
    pub pretty: bool,
}

pub fn transpile_command(args: TranspileArgs, config: &CliConfig) -> Result<()> {
    let overrides = Overrides {
        package: args.package,
        resolver: args.resolver.map(Into::into),
        pretty: args.pretty,
    };
    let pipeline = Pipeline::new(config, &overrides)?;
    let output_dir = args.output.or_else(|| config.transpile.output_dir.clone());
    let files = collect_sources(&args.inputs, pipeline.frontend())?;
    if files.is_empty() {
        return Err(CliError::InvalidInput("no source files found".to_string()));
    }

    let mut failed = 0;
    let mut written: Vec<(String, PathBuf)> = Vec::new();
    for (index, path) in files.iter().enumerate() {
        let source = read_source(index as FileId, path)?;
        match pipeline.transpile(&source) {
            Ok(out) => match &output_dir {
                Some(dir) => {
                    if let Some((_, first)) = written.iter().find(|(name, _)| *name == out.class_name) {
                        warn!(
                            class = %out.class_name,
                            first = %first.display(),
                            second = %path.display(),
                            "two sources produce the same class; the later one wins"
                        );
                    }
                    let target = write_unit(dir, &out.class_name, &out.java)?;
                    info!(source = %path.display(), target = %target.display(), "wrote");
                    written.push((out.class_name, path.clone()));
                }
                None => print!("{}", out.java),
            },
            Err(diagnostics) => {
                report(&diagnostics, &source, config.diagnostics.style);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Failed {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}

fn write_unit(dir: &Path, class_name: &str, java: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let target = dir.join(format!("{}.java", class_name));
    fs::write(&target, java)?;
    Ok(target)
}
