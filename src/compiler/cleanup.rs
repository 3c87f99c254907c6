// src/compiler/cleanup.rs

//! Byproduct removal that runs however an invocation ends

use glob::Pattern;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Toolchain scratch directory created next to the source
pub const BUILD_DIR: &str = "build";
/// Bytecode cache directory
pub const PYCACHE_DIR: &str = "__pycache__";
/// Extension of the translated C source
pub const TRANSLATED_EXTENSION: &str = ".c";

/// Remove a file; a missing file is not an error
pub fn remove_file_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a directory tree; a missing directory is not an error
pub fn remove_dir_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Scoped cleanup of one module's build byproducts
///
/// Created before the toolchain runs; removes the translated source, the
/// bytecode cache, stray `*.ui` files and (if it did not exist beforehand)
/// the scratch build directory when dropped.
#[derive(Debug)]
pub struct ByproductCleanup {
    dir: PathBuf,
    stem: String,
    remove_build_dir: bool,
    remove_ui_files: bool,
}

impl ByproductCleanup {
    pub fn new(dir: &Path, stem: &str, remove_ui_files: bool) -> Self {
        let remove_build_dir = !dir.join(BUILD_DIR).exists();
        if !remove_build_dir {
            debug!("Keeping pre-existing {}/{}", dir.display(), BUILD_DIR);
        }
        Self {
            dir: dir.to_path_buf(),
            stem: stem.to_string(),
            remove_build_dir,
            remove_ui_files,
        }
    }

    /// Paths this guard will remove, in removal order
    pub fn targets(&self) -> Vec<PathBuf> {
        let mut targets = vec![
            self.dir.join(format!("{}{}", self.stem, TRANSLATED_EXTENSION)),
            self.dir.join(PYCACHE_DIR),
        ];
        if self.remove_build_dir {
            targets.push(self.dir.join(BUILD_DIR));
        }
        if self.remove_ui_files {
            targets.extend(self.ui_files());
        }
        targets
    }

    fn ui_files(&self) -> Vec<PathBuf> {
        let Some(dir) = self.dir.to_str() else {
            return Vec::new();
        };
        let pattern = format!("{}/*.ui", Pattern::escape(dir));
        match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(|p| p.ok()).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn run(&self) {
        for target in self.targets() {
            let removed = if target.is_dir() {
                remove_dir_if_present(&target)
            } else {
                remove_file_if_present(&target)
            };
            match removed {
                Ok(true) => debug!("Removed {}", target.display()),
                Ok(false) => {}
                Err(e) => warn!("Failed to remove {}: {}", target.display(), e),
            }
        }
    }
}

impl Drop for ByproductCleanup {
    fn drop(&mut self) {
        self.run();
    }
}
