// src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use commands::{ConvertStatus, ReportFormat};
use std::process::ExitCode;

/// Exit code when a package marker could not be restored
const EXIT_MARKER_LOST: u8 = 2;
/// Exit code after SIGINT/SIGTERM, as a shell reports a SIGINT death
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging; RUST_LOG overrides -v
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config =
        commands::compiler_config(cli.python, &cli.language_level, cli.timeout, cli.keep_ui);
    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };

    let status = commands::cmd_convert(
        &cli.path,
        cli.recursive,
        cli.remove,
        cli.yes,
        config,
        cli.jobs,
        format,
        !cli.quiet && !cli.json,
    );

    match status {
        Ok(ConvertStatus::Success) | Ok(ConvertStatus::Cancelled) => ExitCode::SUCCESS,
        Ok(ConvertStatus::Failed) => ExitCode::FAILURE,
        Ok(ConvertStatus::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let marker_lost = e
                .downcast_ref::<py2pyd::Error>()
                .is_some_and(py2pyd::Error::is_marker_loss);
            if marker_lost {
                ExitCode::from(EXIT_MARKER_LOST)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
