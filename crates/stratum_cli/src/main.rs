//! Stratum CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Finished with warnings
//! - 4: Application contract violation
//! - 5: Output error
//!
//! A failing external tool passes its own exit status through.

use std::process::ExitCode;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands, Outcome};
use stratum_core::CoreError;
use stratum_output::OutputError;
use stratum_tools::ToolError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const WARNINGS: u8 = 3;
    pub const CONTRACT_ERROR: u8 = 4;
    pub const OUTPUT_ERROR: u8 = 5;
}

fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stratum=info,warn"))
    };

    // stdout is reserved for manifests and tool output
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let global = cli.global;
    let result = match cli.command {
        Commands::Yaml(args) => commands::yaml::execute(&global, args).await,
        Commands::Build(args) => commands::build::execute(&global, args).await,
        Commands::Push(args) => commands::push::execute(&global, args).await,
    };

    match result {
        Ok(outcome) => exit_for(&outcome),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn exit_for(outcome: &Outcome) -> ExitCode {
    if outcome.warnings == 0 {
        ExitCode::from(ExitCodes::SUCCESS)
    } else {
        warn!("Finished with {} warning(s)", outcome.warnings);
        ExitCode::from(ExitCodes::WARNINGS)
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(tool) = cause.downcast_ref::<ToolError>() {
            if let Some(code) = tool.exit_code() {
                return u8::try_from(code)
                    .ok()
                    .filter(|c| *c != 0)
                    .unwrap_or(ExitCodes::GENERAL_ERROR);
            }
        }
        if cause.downcast_ref::<CoreError>().is_some() {
            return ExitCodes::CONTRACT_ERROR;
        }
        if cause.downcast_ref::<OutputError>().is_some() {
            return ExitCodes::OUTPUT_ERROR;
        }
        if cause.downcast_ref::<commands::UsageError>().is_some() {
            return ExitCodes::INVALID_ARGS;
        }
    }
    ExitCodes::GENERAL_ERROR
}
