// src/platform.rs

//! Host platform facts that shape a native extension build
//!
//! Everything here is keyed by the host OS. Cross-compiling is not supported,
//! so the extension suffix and the extra compiler/linker flags always describe
//! the machine py2pyd runs on.

use serde::Serialize;

/// Host operating system class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Linux,
    MacOs,
    Windows,
    /// Any other Unix-like host (BSDs, illumos, ...)
    OtherUnix,
}

impl HostOs {
    /// The OS this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::OtherUnix
        }
    }

    pub fn is_unix_like(&self) -> bool {
        !matches!(self, Self::Windows)
    }

    /// File extension of a native extension module, including the dot
    pub fn extension_suffix(&self) -> &'static str {
        match self {
            Self::Windows => ".pyd",
            _ => ".so",
        }
    }

    /// Default interpreter name looked up on PATH
    pub fn default_python(&self) -> &'static str {
        match self {
            Self::Windows => "python",
            _ => "python3",
        }
    }
}

/// Extra flags handed to the C compiler and linker for every extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformFlags {
    pub compile_args: Vec<String>,
    pub link_args: Vec<String>,
}

impl PlatformFlags {
    /// Select flags for a host
    ///
    /// Unix-like hosts silence `-Wunreachable-code`, which Cython output trips
    /// constantly. Inside a conda environment the interpreter's shared libraries
    /// live in `<prefix>/lib`, so an rpath relative to the extension is added.
    pub fn for_host(os: HostOs, isolated_env: bool) -> Self {
        if !os.is_unix_like() {
            return Self::default();
        }

        let compile_args = vec!["-Wno-unreachable-code".to_string()];
        let link_args = if isolated_env {
            let origin = match os {
                HostOs::MacOs => "@loader_path",
                _ => "$ORIGIN",
            };
            vec![format!("-Wl,-rpath,{}/../lib", origin)]
        } else {
            Vec::new()
        };

        Self {
            compile_args,
            link_args,
        }
    }
}

/// Whether an interpreter prefix belongs to a conda/miniconda environment
pub fn is_conda_prefix(prefix: &str) -> bool {
    let lower = prefix.to_lowercase();
    lower.contains("conda")
}
