// src/cli/mod.rs
//! CLI definitions for py2pyd
//!
//! This module contains the command-line interface definition using clap.
//! The actual command implementation is in the `commands` module.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "py2pyd")]
#[command(author = "py2pyd Contributors")]
#[command(version)]
#[command(
    about = "Compile Python sources into native extension modules (.so/.pyd)",
    long_about = None
)]
pub struct Cli {
    /// Python file or directory to convert
    pub path: PathBuf,

    /// Convert the whole directory tree instead of only its top level
    #[arg(short, long)]
    pub recursive: bool,

    /// Delete original .py files after they convert successfully
    #[arg(short = 'd', long, visible_alias = "delete")]
    pub remove: bool,

    /// Do not ask for confirmation before deleting sources
    #[arg(short, long)]
    pub yes: bool,

    /// Python interpreter with Cython installed (default: python3 on PATH)
    #[arg(long, env = "PY2PYD_PYTHON")]
    pub python: Option<String>,

    /// Cython language_level directive
    #[arg(long, default_value = "3")]
    pub language_level: String,

    /// Per-file build timeout in seconds
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,

    /// Number of directories to convert in parallel
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Keep stray *.ui files in source directories
    #[arg(long)]
    pub keep_ui: bool,

    /// Print the final report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
