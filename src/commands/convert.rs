// src/commands/convert.rs

//! Convert command - compile a file or directory of Python sources

use super::progress::{ConsoleReport, ReportFormat};
use super::prompt;
use anyhow::{Context, Result, bail};
use py2pyd::{
    BatchOptions, BatchOrchestrator, CompilerConfig, CythonCompiler, TargetMode,
    toolchain::CYTHON_INSTALL_HINT,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// How a conversion run ended, short of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertStatus {
    /// Something converted and nothing failed
    Success,
    /// Some file failed, or there was nothing to convert
    Failed,
    /// The user declined the removal confirmation
    Cancelled,
    /// A termination signal stopped the batch after markers were restored
    Interrupted,
}

/// Pick the batch mode for a target path
pub fn target_mode(path: &Path, recursive: bool) -> Result<TargetMode> {
    if path.is_file() {
        let is_source = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(py2pyd::source::SOURCE_EXTENSION));
        if !is_source {
            bail!("Not a Python file: {}", path.display());
        }
        Ok(TargetMode::SingleFile)
    } else if path.is_dir() {
        Ok(if recursive {
            TargetMode::Recursive
        } else {
            TargetMode::Directory
        })
    } else {
        bail!("Path does not exist: {}", path.display());
    }
}

/// Convert a file or directory
///
/// # Arguments
/// * `path` - Python file or directory
/// * `recursive` - Walk the whole tree under a directory
/// * `remove` - Delete sources that converted successfully
/// * `yes` - Skip the removal confirmation
/// * `config` - Compiler configuration
/// * `jobs` - Directories converted in parallel
/// * `format` - Final report format
/// * `show_progress` - Draw a progress bar on a terminal
#[allow(clippy::too_many_arguments)]
pub fn cmd_convert(
    path: &Path,
    recursive: bool,
    remove: bool,
    yes: bool,
    config: CompilerConfig,
    jobs: usize,
    format: ReportFormat,
    show_progress: bool,
) -> Result<ConvertStatus> {
    let mode = target_mode(path, recursive)?;

    // Dependency check happens before anything on disk is touched
    let compiler = CythonCompiler::detect(config).with_context(|| {
        format!(
            "Toolchain check failed (install Cython with: {})",
            CYTHON_INSTALL_HINT
        )
    })?;
    let toolchain = compiler.toolchain();
    info!(
        "Using Python {} / Cython {} at {}",
        toolchain.python_version,
        toolchain.cython_version,
        toolchain.python.display()
    );

    if remove && !yes {
        let confirmed = prompt::confirm(
            "Warning: --remove deletes every .py file that converts successfully. Continue?",
        )?;
        if !confirmed {
            println!("Operation cancelled");
            return Ok(ConvertStatus::Cancelled);
        }
    }

    // From here on Ctrl-C must not leave a package marker off disk
    py2pyd::interrupt::install().context("Cannot install signal handlers")?;

    let options = BatchOptions::new(mode)
        .with_remove_on_success(remove)
        .with_jobs(jobs);
    let report = ConsoleReport::new(format, show_progress);
    let orchestrator = BatchOrchestrator::new(&compiler, &report, options);

    let result = orchestrator
        .run(path)
        .with_context(|| format!("Conversion of {} aborted", path.display()))?;

    Ok(if result.interrupted {
        ConvertStatus::Interrupted
    } else if result.is_success() {
        ConvertStatus::Success
    } else {
        ConvertStatus::Failed
    })
}

/// Build the compiler configuration from CLI values
pub fn compiler_config(
    python: Option<String>,
    language_level: &str,
    timeout_secs: u64,
    keep_ui: bool,
) -> CompilerConfig {
    let mut config = CompilerConfig::default()
        .with_language_level(language_level)
        .with_timeout(Duration::from_secs(timeout_secs.max(1)))
        .with_remove_ui_files(!keep_ui);
    if let Some(python) = python {
        config = config.with_python(python);
    }
    config
}
