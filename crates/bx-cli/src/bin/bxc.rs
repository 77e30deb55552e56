//! `bxc`: CFML/BoxLang to Java transpiler
//!
//! # Usage
//!
//! ```bash
//! # Print the Java for one component
//! bxc transpile models/User.cfc
//!
//! # Write one .java file per source into out/
//! bxc transpile src/ -o out --package com.acme.app
//!
//! # Parse and lower everything, reporting every failure
//! bxc check src/
//!
//! # Dump the source tree as JSON
//! bxc parse views/index.cfm --format json
//! ```

use std::path::PathBuf;

use bx_cli::{
    cli::CliConfig,
    commands::{self, check::CheckArgs, parse::ParseArgs, transpile::TranspileArgs},
    diagnostics::setup_error_reporting,
    CliError,
};
use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Context, Result};
use tracing::{debug, error};

#[derive(Parser)]
#[command(
    name = "bxc",
    version = env!("CARGO_PKG_VERSION"),
    about = "Transpile CFML/BoxLang components and templates to Java"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (use multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level (overrides --verbose/--quiet)
    #[arg(long, global = true, value_enum)]
    log: Option<LogLevel>,

    /// Set log output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Transpile sources to Java
    Transpile(TranspileArgs),

    /// Parse one file and display its tree or diagnostics
    Parse(ParseArgs),

    /// Parse and lower sources, reporting every failure
    Check(CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_error_reporting()?;
    setup_logging(cli.verbose, cli.quiet, cli.log, cli.log_format)?;

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir)
            .with_context(|| format!("Failed to change directory to {}", dir.display()))?;
        debug!("Changed working directory to: {}", dir.display());
    }

    let config = CliConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Transpile(args) => commands::transpile_command(args, &config),
        Commands::Parse(args) => commands::parse_command(args, &config),
        Commands::Check(args) => commands::check_command(args, &config),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err @ CliError::Failed { .. }) => {
            // Diagnostics are already on stderr.
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
        Err(err) => {
            error!("{}", err);
            if cli.verbose > 0 {
                error!(?err, "detailed error context");
            }
            std::process::exit(1);
        }
    }
}

fn setup_logging(
    verbose: u8,
    quiet: bool,
    log_level: Option<LogLevel>,
    log_format: LogFormat,
) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if let Some(level) = log_level {
        match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Generated Java goes to stdout; logs never do.
    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match log_format {
        LogFormat::Pretty => registry.with(formatter).try_init(),
        LogFormat::Compact => registry.with(formatter.compact()).try_init(),
        LogFormat::Json => registry.with(formatter.json()).try_init(),
    };
    installed.wrap_err("Failed to install logging")?;

    Ok(())
}
