// src/compiler/mod.rs

//! Compiler invocation: one `.py` file in, one native extension out
//!
//! The `Compiler` trait is the seam the batch orchestrator talks to. The real
//! implementation, `CythonCompiler`, drives setuptools + Cython in the source
//! file's own directory:
//!
//! 1. write a transient build script next to the source
//! 2. run `python <script> build_ext --inplace` with that directory as the
//!    child's working directory (the process-wide cwd is never changed)
//! 3. find the tagged artifact and rename it to `<stem><ext>`
//! 4. remove byproducts (translated C, scratch build dir, bytecode cache, ...)
//!
//! Every failure, including a timeout, comes back as a `ConversionOutcome`
//! rather than an error.

mod artifact;
mod cleanup;
mod descriptor;

pub use artifact::canonical_path;
pub use cleanup::remove_file_if_present;
pub use descriptor::BuildDescriptor;

use self::cleanup::ByproductCleanup;
use crate::error::{Error, Result};
use crate::platform::HostOs;
use crate::process::run_with_timeout;
use crate::source::SourceFile;
use crate::toolchain::Toolchain;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Default time allowed for one module build (10 minutes)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Default Cython `language_level`
pub const DEFAULT_LANGUAGE_LEVEL: &str = "3";

/// Diagnostic used when the toolchain fails without output
pub const UNKNOWN_FAILURE: &str = "compile failed: unknown failure";

/// Result of converting one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConversionOutcome {
    /// The extension module was written to `artifact`
    Success { artifact: PathBuf },
    /// Conversion failed; `reason` is a human-readable diagnostic
    Failure { reason: String },
}

impl ConversionOutcome {
    pub fn success(artifact: impl Into<PathBuf>) -> Self {
        Self::Success {
            artifact: artifact.into(),
        }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure diagnostic, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }
}

/// Converts a single source file into a native extension module
///
/// Implementations must not panic or return errors for per-file problems;
/// everything is reported through the outcome.
pub trait Compiler: Send + Sync {
    fn compile(&self, source: &Path) -> ConversionOutcome;
}

/// Configuration for `CythonCompiler`
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Interpreter name or path
    pub python: String,
    /// Cython `language_level` directive
    pub language_level: String,
    /// Time allowed for one module build
    pub timeout: Duration,
    /// Remove stray `*.ui` files from the source directory
    pub remove_ui_files: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            python: HostOs::current().default_python().to_string(),
            language_level: DEFAULT_LANGUAGE_LEVEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            remove_ui_files: true,
        }
    }
}

impl CompilerConfig {
    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_language_level(mut self, level: impl Into<String>) -> Self {
        self.language_level = level.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_remove_ui_files(mut self, remove: bool) -> Self {
        self.remove_ui_files = remove;
        self
    }
}

/// Compiler backed by setuptools and Cython
#[derive(Debug, Clone)]
pub struct CythonCompiler {
    toolchain: Toolchain,
    config: CompilerConfig,
}

impl CythonCompiler {
    pub fn new(toolchain: Toolchain, config: CompilerConfig) -> Self {
        Self { toolchain, config }
    }

    /// Probe the configured interpreter and build a compiler for it
    pub fn detect(config: CompilerConfig) -> Result<Self> {
        let toolchain = Toolchain::detect(&config.python)?;
        Ok(Self::new(toolchain, config))
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    fn try_compile(&self, source: &SourceFile) -> Result<PathBuf> {
        if !source.path.is_file() {
            return Err(Error::Compile(format!(
                "source file not found: {}",
                source.path.display()
            )));
        }

        let ext = self.toolchain.extension_suffix();
        let started = SystemTime::now();
        let _cleanup =
            ByproductCleanup::new(&source.dir, &source.stem, self.config.remove_ui_files);

        let descriptor = BuildDescriptor::new(
            &source.stem,
            &source.file_name,
            self.toolchain.platform_flags(),
            &self.config.language_level,
        );
        let script = descriptor.write_in(&source.dir)?;

        let mut cmd = Command::new(&self.toolchain.python);
        cmd.arg(script.path())
            .arg("build_ext")
            .arg("--inplace")
            .current_dir(&source.dir)
            .env("PY2PYD_MODULE", &source.stem)
            .env("PY2PYD_SOURCE", &source.path);

        let output = run_with_timeout(cmd, self.config.timeout)?;
        if !output.success() {
            let diagnostic = output.combined();
            debug!(
                "Toolchain exited with {:?} for {}",
                output.status.code(),
                source.path.display()
            );
            return Err(Error::Compile(if diagnostic.is_empty() {
                UNKNOWN_FAILURE.to_string()
            } else {
                format!("compile failed:\n{}", diagnostic)
            }));
        }

        let found = artifact::locate(&source.dir, &source.stem, ext, started)?.ok_or_else(|| {
            Error::Compile(format!(
                "compiled but no extension module ({}*{}) was produced",
                source.stem, ext
            ))
        })?;

        artifact::install_canonical(&found, &source.dir, &source.stem, ext)
    }
}

impl Compiler for CythonCompiler {
    fn compile(&self, path: &Path) -> ConversionOutcome {
        let source = match SourceFile::new(path) {
            Ok(source) => source,
            Err(e) => return ConversionOutcome::failure(e.to_string()),
        };

        info!("Compiling {}", source.path.display());
        match self.try_compile(&source) {
            Ok(artifact) => {
                info!("Built {}", artifact.display());
                ConversionOutcome::success(artifact)
            }
            Err(e) => ConversionOutcome::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_helpers() {
        let ok = ConversionOutcome::success("/w/a.so");
        assert!(ok.is_success());
        assert_eq!(ok.reason(), None);

        let failed = ConversionOutcome::failure("syntax error");
        assert!(!failed.is_success());
        assert_eq!(failed.reason(), Some("syntax error"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let json = serde_json::to_string(&ConversionOutcome::failure("boom")).unwrap();
        assert_eq!(json, r#"{"status":"failure","reason":"boom"}"#);
    }

    #[test]
    fn test_config_builders() {
        let config = CompilerConfig::default()
            .with_python("/opt/py/bin/python3")
            .with_language_level("3str")
            .with_timeout(Duration::from_secs(5))
            .with_remove_ui_files(false);

        assert_eq!(config.python, "/opt/py/bin/python3");
        assert_eq!(config.language_level, "3str");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.remove_ui_files);
    }

    #[test]
    fn test_missing_source_is_failure() {
        let toolchain = Toolchain {
            python: PathBuf::from("/nonexistent/python3"),
            python_version: "3.11.0".to_string(),
            cython_version: "3.0.0".to_string(),
            prefix: "/usr".to_string(),
            host: HostOs::current(),
        };
        let compiler = CythonCompiler::new(toolchain, CompilerConfig::default());
        let tmp = tempfile::tempdir().unwrap();

        let outcome = compiler.compile(&tmp.path().join("ghost.py"));
        assert!(outcome.reason().unwrap().contains("source file not found"));

        let outcome = compiler.compile(&tmp.path().join("notes.txt"));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_unrunnable_interpreter_is_failure() {
        let toolchain = Toolchain {
            python: PathBuf::from("/nonexistent/python3"),
            python_version: "3.11.0".to_string(),
            cython_version: "3.0.0".to_string(),
            prefix: "/usr".to_string(),
            host: HostOs::current(),
        };
        let compiler = CythonCompiler::new(toolchain, CompilerConfig::default());
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.py"), "x = 1\n").unwrap();

        let outcome = compiler.compile(&tmp.path().join("a.py"));
        assert!(!outcome.is_success());
        // Descriptor is gone even though the toolchain never ran
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(leftovers, vec!["a.py"]);
    }
}
