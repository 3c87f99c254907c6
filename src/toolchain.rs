// src/toolchain.rs

//! Python/Cython toolchain discovery
//!
//! The toolchain is probed exactly once, before any batch work begins. A
//! missing interpreter or a missing Cython installation is fatal and is
//! reported before the filesystem is touched.

use crate::error::{Error, Result};
use crate::platform::{self, HostOs, PlatformFlags};
use crate::process::run_with_timeout;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info};

/// Time allowed for the interpreter probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Printed by the interpreter as `key=value` lines
const PROBE_SCRIPT: &str = "\
import sys
print('python=' + sys.version.split()[0])
print('prefix=' + sys.prefix)
try:
    import Cython
    print('cython=' + Cython.__version__)
except ImportError:
    print('cython=')
";

/// Install hint shown when Cython cannot be imported
pub const CYTHON_INSTALL_HINT: &str = "pip install cython";

/// A probed Python interpreter with Cython available
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    /// Absolute path of the interpreter
    pub python: PathBuf,
    /// Interpreter version, e.g. "3.11.4"
    pub python_version: String,
    /// Cython version, e.g. "3.0.10"
    pub cython_version: String,
    /// `sys.prefix` of the interpreter
    pub prefix: String,
    /// Host the toolchain builds for
    pub host: HostOs,
}

impl Toolchain {
    /// Resolve and probe an interpreter
    ///
    /// `python` may be a bare program name (looked up on PATH) or a path.
    pub fn detect(python: &str) -> Result<Self> {
        let python_path = resolve_interpreter(python)?;
        debug!("Probing interpreter {}", python_path.display());

        let mut cmd = Command::new(&python_path);
        cmd.arg("-c").arg(PROBE_SCRIPT);
        let output = run_with_timeout(cmd, PROBE_TIMEOUT).map_err(|e| {
            Error::DependencyMissing(format!(
                "cannot run Python interpreter {}: {}",
                python_path.display(),
                e
            ))
        })?;

        if !output.success() {
            return Err(Error::DependencyMissing(format!(
                "Python interpreter {} failed the probe: {}",
                python_path.display(),
                output.combined()
            )));
        }

        let toolchain = Self::from_probe(python_path, &output.stdout)?;
        info!(
            "Detected Python {} with Cython {} ({})",
            toolchain.python_version,
            toolchain.cython_version,
            toolchain.python.display()
        );
        Ok(toolchain)
    }

    /// Build a toolchain from probe output
    fn from_probe(python: PathBuf, stdout: &str) -> Result<Self> {
        let mut python_version = None;
        let mut prefix = None;
        let mut cython_version = None;

        for line in stdout.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "python" => python_version = Some(value),
                "prefix" => prefix = Some(value),
                "cython" => cython_version = Some(value),
                _ => {}
            }
        }

        let cython_version = cython_version.filter(|v| !v.is_empty()).ok_or_else(|| {
            Error::DependencyMissing(format!(
                "Cython is not installed for {}; install it with: {}",
                python.display(),
                CYTHON_INSTALL_HINT
            ))
        })?;

        Ok(Self {
            python,
            python_version: python_version.unwrap_or_else(|| "unknown".to_string()),
            cython_version,
            prefix: prefix.unwrap_or_default(),
            host: HostOs::current(),
        })
    }

    /// Whether the interpreter lives in a conda-style isolated environment
    pub fn is_isolated_env(&self) -> bool {
        platform::is_conda_prefix(&self.prefix)
    }

    /// Compiler/linker flags for this toolchain's host
    pub fn platform_flags(&self) -> PlatformFlags {
        PlatformFlags::for_host(self.host, self.is_isolated_env())
    }

    /// Extension module suffix (".so" or ".pyd")
    pub fn extension_suffix(&self) -> &'static str {
        self.host.extension_suffix()
    }
}

fn resolve_interpreter(python: &str) -> Result<PathBuf> {
    let candidate = Path::new(python);
    if candidate.components().count() > 1 {
        if candidate.is_file() {
            return Ok(std::path::absolute(candidate)?);
        }
        return Err(Error::DependencyMissing(format!(
            "Python interpreter not found: {}",
            candidate.display()
        )));
    }

    which::which(python).map_err(|e| {
        Error::DependencyMissing(format!(
            "Python interpreter '{}' not found in PATH: {}",
            python, e
        ))
    })
}
