// src/commands/progress.rs
//! Console reporting for batch conversion
//!
//! A progress bar while files compile, then a human-readable (or JSON)
//! report once the batch ends.

use indicatif::{ProgressBar, ProgressStyle};
use py2pyd::{BatchResult, ConversionOutcome, ReportSink};
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

/// Diagnostics longer than this keep only their last lines in the report
const MAX_REASON_LINES: usize = 8;

/// Final report format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Progress bar plus end-of-run report
pub struct ConsoleReport {
    bar: ProgressBar,
    format: ReportFormat,
}

impl ConsoleReport {
    /// Create a reporter; the bar is hidden when `show_progress` is false or
    /// stderr is not a terminal
    pub fn new(format: ReportFormat, show_progress: bool) -> Self {
        let bar = if show_progress && std::io::stderr().is_terminal() {
            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} {msg} [{bar:40.green/dim}] {pos}/{len}")
                    .expect("Invalid progress bar template")
                    .progress_chars("##-"),
            );
            bar
        } else {
            ProgressBar::hidden()
        };

        Self { bar, format }
    }
}

impl ReportSink for ConsoleReport {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_message("Converting");
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn file_finished(&self, source: &Path, outcome: &ConversionOutcome) {
        if !outcome.is_success() {
            self.bar.println(format!("  [FAILED] {}", source.display()));
        }
        self.bar.inc(1);
    }

    fn finish(&self, result: &BatchResult) {
        self.bar.finish_and_clear();
        match self.format {
            ReportFormat::Text => print!("{}", render_report(result)),
            ReportFormat::Json => match serde_json::to_string_pretty(result) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize report: {}", e),
            },
        }
    }
}

/// Human-readable end-of-run report
pub fn render_report(result: &BatchResult) -> String {
    let mut out = String::new();

    if result.processed() == 0 && !result.aborted && !result.interrupted {
        out.push_str("No .py files found\n");
        return out;
    }

    if result.is_success() {
        out.push_str(&format!("Done: {} converted\n", result.success_count));
    } else {
        out.push_str(&format!(
            "Done: {} converted, {} failed\n",
            result.success_count, result.fail_count
        ));
    }

    if result.removed_sources > 0 {
        out.push_str(&format!(
            "Removed {} original source file(s)\n",
            result.removed_sources
        ));
    }

    if !result.failed.is_empty() {
        out.push_str("Failed files:\n");
        for failed in &result.failed {
            out.push_str(&format!("  - {}\n", failed.path.display()));
            for line in tail_lines(&failed.reason, MAX_REASON_LINES) {
                out.push_str(&format!("      {}\n", line));
            }
        }
    }

    if result.interrupted {
        out.push_str("Interrupted; remaining files were skipped\n");
    }
    if result.aborted {
        out.push_str("Batch aborted before completion\n");
    }
    out
}

fn tail_lines(text: &str, max: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(max);
    lines[skip..].to_vec()
}
