//! Jarvault CLI Binary
//!
//! Command-line interface for restoring and inspecting jarvault backups.

use anyhow::{anyhow, Context};
use clap::Parser;
use jarvault::cli::{exit_code, map_error, Cli, RunContext};
use jarvault::config::ConfigLoader;
use jarvault::logging::{init_logging, LoggingConfig};
use std::path::Path;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Jarvault CLI starting");

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Execute the parsed command and return the process exit code.
fn run(cli: &Cli) -> anyhow::Result<i32> {
    let context = RunContext::new(cli.root.clone(), cli.config.clone())
        .context("Failed to load configuration")?;

    let output = context
        .execute(&cli.command)
        .map_err(|e| anyhow!(map_error(&e)))?;
    println!("{}", output.text);

    let code = exit_code(output.report.as_ref());
    if code != 0 {
        error!(code, "Command completed with entry failures");
    }
    Ok(code)
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = match (&cli.config, &cli.root) {
        (Some(path), _) => ConfigLoader::load_from_file(path).ok(),
        (None, Some(root)) => ConfigLoader::load(root).ok(),
        (None, None) => ConfigLoader::load(Path::new(".")).ok(),
    }
    .map(|c| c.logging)
    .unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}
