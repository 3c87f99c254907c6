// src/progress.rs

//! Report sinks for batch conversion
//!
//! The orchestrator announces the batch size, one event per finished file (in
//! completion order), and a terminal summary. Sinks only observe; nothing they
//! do can change how the batch proceeds.
//!
//! Implementations here:
//! - `SilentSink`: no-op for scripted/quiet use
//! - `LogSink`: logs to tracing
//! - `CallbackSink`: forwards `ReportEvent`s to a closure
//!
//! The CLI's progress bar lives with the command handlers.

use crate::batch::BatchResult;
use crate::compiler::ConversionOutcome;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Receives batch progress and the final tally
///
/// Must be thread-safe: with more than one job, files in different
/// directories finish on different threads.
pub trait ReportSink: Send + Sync {
    /// Called once before the first file, with the number of candidates
    fn start(&self, _total: u64) {}

    /// Called once per candidate as soon as its outcome is known
    fn file_finished(&self, source: &Path, outcome: &ConversionOutcome);

    /// Called once when the batch ends, including after a fatal error
    fn finish(&self, result: &BatchResult);
}

/// Sink that ignores everything
#[derive(Debug, Default)]
pub struct SilentSink;

impl ReportSink for SilentSink {
    fn file_finished(&self, _source: &Path, _outcome: &ConversionOutcome) {}

    fn finish(&self, _result: &BatchResult) {}
}

/// Sink that logs every event at info level
#[derive(Debug, Default)]
pub struct LogSink {
    total: AtomicU64,
    done: AtomicU64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportSink for LogSink {
    fn start(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        info!("Converting {} file(s)", total);
    }

    fn file_finished(&self, source: &Path, outcome: &ConversionOutcome) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        match outcome {
            ConversionOutcome::Success { artifact } => {
                info!("[{}/{}] {} -> {}", done, total, source.display(), artifact.display())
            }
            ConversionOutcome::Failure { reason } => {
                warn!("[{}/{}] {} failed: {}", done, total, source.display(), reason)
            }
        }
    }

    fn finish(&self, result: &BatchResult) {
        info!(
            "Finished: {} succeeded, {} failed",
            result.success_count, result.fail_count
        );
    }
}

/// Events emitted by `CallbackSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    Started { total: u64 },
    FileFinished { source: PathBuf, outcome: ConversionOutcome },
    Finished(BatchResult),
}

/// Sink that calls a user-provided function for every event
pub struct CallbackSink<F>
where
    F: Fn(ReportEvent) + Send + Sync,
{
    callback: F,
}

impl<F> CallbackSink<F>
where
    F: Fn(ReportEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ReportSink for CallbackSink<F>
where
    F: Fn(ReportEvent) + Send + Sync,
{
    fn start(&self, total: u64) {
        (self.callback)(ReportEvent::Started { total });
    }

    fn file_finished(&self, source: &Path, outcome: &ConversionOutcome) {
        (self.callback)(ReportEvent::FileFinished {
            source: source.to_path_buf(),
            outcome: outcome.clone(),
        });
    }

    fn finish(&self, result: &BatchResult) {
        (self.callback)(ReportEvent::Finished(result.clone()));
    }
}
