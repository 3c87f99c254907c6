// src/error.rs
//! Error types for py2pyd

use std::path::PathBuf;
use thiserror::Error;

/// Result type for py2pyd operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while planning or running a conversion batch
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Required toolchain (interpreter or Cython) is not available
    #[error("missing dependency: {0}")]
    DependencyMissing(String),

    /// Target path cannot be converted
    #[error("invalid target {}: {reason}", .path.display())]
    InvalidTarget { path: PathBuf, reason: String },

    /// Directory traversal failed
    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    /// Artifact lookup pattern could not be built
    #[error("invalid artifact pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Package marker could not be taken off disk
    #[error("cannot capture package marker in {}: {source}", .dir.display())]
    MarkerCapture {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Package marker could not be written back; its content survives only in `rescue`
    #[error(
        "failed to restore package marker in {}: {source}{}",
        .dir.display(),
        rescue_hint(.rescue)
    )]
    MarkerRestore {
        dir: PathBuf,
        rescue: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Toolchain invocation failed for one file
    #[error("{0}")]
    Compile(String),

    /// Toolchain invocation exceeded its time limit
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    /// A termination signal arrived while the toolchain was running
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    /// Create an invalid-target error with a message
    pub fn invalid_target(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether a package marker may have been lost on disk
    pub fn is_marker_loss(&self) -> bool {
        matches!(self, Self::MarkerRestore { .. })
    }
}

fn rescue_hint(rescue: &Option<PathBuf>) -> String {
    match rescue {
        Some(path) => format!(" (original content saved to {})", path.display()),
        None => " (original content could not be saved)".to_string(),
    }
}
