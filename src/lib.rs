// src/lib.rs

//! py2pyd: batch conversion of Python sources into native extension modules
//!
//! Every `.py` file under a target is compiled in place with Cython into
//! `<stem>.so` (or `<stem>.pyd` on Windows); originals can optionally be
//! removed afterwards.
//!
//! # Architecture
//!
//! - `source`: decides which files a batch converts, grouped per directory
//! - `marker`: keeps `__init__.py` off disk while its siblings compile and
//!   always writes it back
//! - `compiler`: one file in, one extension out, failures as values
//! - `batch`: sequences the above, isolates failures, tallies results
//! - `progress`: report sinks that observe a batch
//! - `interrupt`: turns SIGINT/SIGTERM into a cooperative stop

pub mod batch;
pub mod compiler;
mod error;
pub mod interrupt;
pub mod marker;
pub mod platform;
pub mod process;
pub mod progress;
pub mod source;
pub mod toolchain;

pub use batch::{BatchOptions, BatchOrchestrator, BatchResult, FailedFile};
pub use compiler::{Compiler, CompilerConfig, ConversionOutcome, CythonCompiler};
pub use error::{Error, Result};
pub use marker::MarkerGuard;
pub use platform::{HostOs, PlatformFlags};
pub use progress::{CallbackSink, LogSink, ReportEvent, ReportSink, SilentSink};
pub use source::{BatchPlan, DirectoryBatch, MARKER_FILE, SourceFile, TargetMode};
pub use toolchain::Toolchain;
