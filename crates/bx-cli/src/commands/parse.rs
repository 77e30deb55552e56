use std::path::PathBuf;

use bx_lang::ParseResult;
use clap::{Args, ValueEnum};

use crate::cli::CliConfig;
use crate::diagnostics::report;
use crate::pipeline::{Overrides, Pipeline};
use crate::sources::read_source;
use crate::{CliError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ParseFormat {
    /// Rust debug rendering of the tree
    #[default]
    Debug,
    /// The tree, or the diagnostic records, as JSON
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct ParseArgs {
    /// File to parse
    pub file: PathBuf,

    #[arg(long, value_enum, default_value = "debug")]
    pub format: ParseFormat,
}

/// Dumps the source tree, or the diagnostics when the parse failed.
pub fn parse_command(args: ParseArgs, config: &CliConfig) -> Result<()> {
    let pipeline = Pipeline::new(config, &Overrides::default())?;
    let source = read_source(0, &args.file)?;
    match pipeline.parse(&source) {
        ParseResult::Correct(program) => {
            match args.format {
                ParseFormat::Debug => println!("{:#?}", program),
                ParseFormat::Json => println!("{}", serde_json::to_string_pretty(&program)?),
            }
            Ok(())
        }
        failed @ ParseResult::Failed(_) => {
            match args.format {
                ParseFormat::Debug => {
                    report(failed.diagnostics(), &source, config.diagnostics.style)
                }
                ParseFormat::Json => {
                    let records = failed.records(&source);
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
            }
            Err(CliError::Failed {
                failed: 1,
                total: 1,
            })
        }
    }
}
