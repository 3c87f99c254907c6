// src/batch.rs

//! Batch orchestration
//!
//! Walks the planned directories one at a time (or several at once with
//! `jobs > 1`), protects each directory's package marker while its siblings
//! are compiled, and records one outcome per candidate. A failed file never
//! stops the batch; only a marker that cannot be written back does.

use crate::compiler::{Compiler, ConversionOutcome, remove_file_if_present};
use crate::error::{Error, Result};
use crate::interrupt;
use crate::marker::MarkerGuard;
use crate::progress::ReportSink;
use crate::source::{self, BatchPlan, DirectoryBatch, SourceFile, TargetMode};
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// A source file that failed to convert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Tally of one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub success_count: usize,
    pub fail_count: usize,
    /// Failures in discovery order
    pub failed: Vec<FailedFile>,
    /// Original sources deleted after a successful conversion
    pub removed_sources: usize,
    /// The batch stopped early on a fatal error
    pub aborted: bool,
    /// A termination signal stopped the batch; remaining files were skipped
    pub interrupted: bool,
}

impl BatchResult {
    /// Fully successful: something converted, nothing failed, nothing skipped
    pub fn is_success(&self) -> bool {
        self.success_count > 0 && self.fail_count == 0 && !self.aborted && !self.interrupted
    }

    /// Number of candidates that were processed
    pub fn processed(&self) -> usize {
        self.success_count + self.fail_count
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &Path> {
        self.failed.iter().map(|f| f.path.as_path())
    }

    fn record(&mut self, record: FileRecord) {
        match record.outcome {
            ConversionOutcome::Success { .. } => {
                self.success_count += 1;
                if record.removed {
                    self.removed_sources += 1;
                }
            }
            ConversionOutcome::Failure { reason } => {
                self.fail_count += 1;
                self.failed.push(FailedFile {
                    path: record.path,
                    reason,
                });
            }
        }
    }
}

/// How a batch runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub mode: TargetMode,
    /// Delete each source whose conversion succeeded
    pub remove_on_success: bool,
    /// Directories processed concurrently; files within a directory are always sequential
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            mode: TargetMode::Recursive,
            remove_on_success: false,
            jobs: 1,
        }
    }
}

impl BatchOptions {
    pub fn new(mode: TargetMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_remove_on_success(mut self, remove: bool) -> Self {
        self.remove_on_success = remove;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}

#[derive(Debug)]
struct FileRecord {
    path: PathBuf,
    outcome: ConversionOutcome,
    removed: bool,
}

#[derive(Debug, Default)]
struct DirectoryReport {
    files: Vec<FileRecord>,
    fatal: Option<Error>,
}

/// Drives a `Compiler` over a planned set of directories
pub struct BatchOrchestrator<'a> {
    compiler: &'a dyn Compiler,
    sink: &'a dyn ReportSink,
    options: BatchOptions,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        compiler: &'a dyn Compiler,
        sink: &'a dyn ReportSink,
        options: BatchOptions,
    ) -> Self {
        Self {
            compiler,
            sink,
            options,
        }
    }

    /// Discover candidates under `target` and convert them
    pub fn run(&self, target: &Path) -> Result<BatchResult> {
        let plan = source::discover(target, self.options.mode)?;
        info!(
            "Planned {} file(s) in {} director(ies) under {}",
            plan.candidate_count(),
            plan.directories.len(),
            target.display()
        );
        self.run_plan(&plan)
    }

    /// Convert an already discovered plan
    ///
    /// Returns `Err` only for fatal conditions (a package marker that could
    /// not be restored); the sink still receives the summary in that case.
    /// An interrupt is not fatal: markers are written back and the partial
    /// result comes back with `interrupted` set.
    pub fn run_plan(&self, plan: &BatchPlan) -> Result<BatchResult> {
        let guard = MarkerGuard::new();
        let stop = AtomicBool::new(false);

        self.sink.start(plan.candidate_count() as u64);

        let reports: Vec<DirectoryReport> = if self.options.jobs <= 1 {
            let mut reports = Vec::with_capacity(plan.directories.len());
            for batch in &plan.directories {
                reports.push(self.process_directory(batch, &guard, &stop));
                if should_stop(&stop) {
                    break;
                }
            }
            reports
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .build()
                .map_err(std::io::Error::other)?;
            pool.install(|| {
                plan.directories
                    .par_iter()
                    .map(|batch| self.process_directory(batch, &guard, &stop))
                    .collect()
            })
        };

        let leftover = guard.release_all();

        let mut result = BatchResult::default();
        let mut fatal = None;
        for report in reports {
            for record in report.files {
                result.record(record);
            }
            if fatal.is_none() {
                fatal = report.fatal;
            }
        }
        if let Err(e) = leftover {
            fatal.get_or_insert(e);
        }
        result.aborted = fatal.is_some();
        result.interrupted = interrupt::is_requested();
        if result.interrupted {
            warn!("Interrupted after {} file(s)", result.processed());
        }

        self.sink.finish(&result);
        match fatal {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    fn process_directory(
        &self,
        batch: &DirectoryBatch,
        guard: &MarkerGuard,
        stop: &AtomicBool,
    ) -> DirectoryReport {
        let mut report = DirectoryReport::default();
        if should_stop(stop) {
            return report;
        }

        let captured = batch.has_marker
            && match guard.capture(&batch.dir) {
                Ok(captured) => captured,
                Err(e) => {
                    warn!("{}; converting without moving it", e);
                    false
                }
            };

        for source in &batch.candidates {
            if should_stop(stop) {
                debug!("Stopping before {}", source.path.display());
                break;
            }
            let record = self.convert_one(source);
            self.sink.file_finished(&record.path, &record.outcome);
            report.files.push(record);
        }

        if captured {
            if let Err(e) = guard.release(&batch.dir) {
                stop.store(true, Ordering::SeqCst);
                report.fatal = Some(e);
            }
        }
        report
    }

    fn convert_one(&self, source: &SourceFile) -> FileRecord {
        let compile = AssertUnwindSafe(|| self.compiler.compile(&source.path));
        let outcome = panic::catch_unwind(compile).unwrap_or_else(|payload| {
            let message = panic_message(&*payload);
            ConversionOutcome::failure(format!("compiler panicked: {}", message))
        });

        let mut removed = false;
        if outcome.is_success() && self.options.remove_on_success {
            match remove_file_if_present(&source.path) {
                Ok(_) => {
                    debug!("Removed source {}", source.path.display());
                    removed = true;
                }
                Err(e) => warn!(
                    "Converted but could not remove {}: {}",
                    source.path.display(),
                    e
                ),
            }
        }

        FileRecord {
            path: source.path.clone(),
            outcome,
            removed,
        }
    }
}

/// Fatal error in another directory, or a termination signal
fn should_stop(stop: &AtomicBool) -> bool {
    stop.load(Ordering::SeqCst) || interrupt::is_requested()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
