// src/source.rs

//! Source discovery: which files a batch converts, grouped by directory

use crate::error::{Error, Result};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of convertible source files
pub const SOURCE_EXTENSION: &str = ".py";

/// Reserved package marker, never converted in directory modes
pub const MARKER_FILE: &str = "__init__.py";

/// A convertible source file found during traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Directory containing the file
    pub dir: PathBuf,
    /// File name with extension
    pub file_name: String,
    /// File name without the source extension
    pub stem: String,
}

impl SourceFile {
    /// Describe a source file; the path is made absolute
    pub fn new(path: &Path) -> Result<Self> {
        let path = std::path::absolute(path)?;
        let file_name = path
            .file_name()
            .and_then(OsStr::to_str)
            .ok_or_else(|| Error::invalid_target(&path, "file name is not valid UTF-8"))?
            .to_string();
        let stem = file_name
            .strip_suffix(SOURCE_EXTENSION)
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| Error::invalid_target(&path, "not a .py file"))?
            .to_string();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::invalid_target(&path, "file has no parent directory"))?;

        Ok(Self {
            path,
            dir,
            file_name,
            stem,
        })
    }

    pub fn is_marker(&self) -> bool {
        self.file_name == MARKER_FILE
    }
}

/// What a batch is pointed at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// Exactly one source file
    SingleFile,
    /// Direct children of one directory
    Directory,
    /// A whole directory tree
    Recursive,
}

/// All candidates of one directory, plus whether it carries a marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBatch {
    pub dir: PathBuf,
    pub has_marker: bool,
    pub candidates: Vec<SourceFile>,
}

/// Ordered list of directories to process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub directories: Vec<DirectoryBatch>,
}

impl BatchPlan {
    /// Number of files that will be handed to the compiler
    pub fn candidate_count(&self) -> usize {
        self.directories.iter().map(|d| d.candidates.len()).sum()
    }

    /// Candidates across the whole plan, in discovery order
    pub fn candidates(&self) -> impl Iterator<Item = &SourceFile> {
        self.directories.iter().flat_map(|d| d.candidates.iter())
    }
}

/// Build the plan for a target
///
/// Directories are visited depth-first with entries sorted by name, so the
/// order is deterministic. Directories with neither candidates nor a marker
/// are left out. In directory modes the marker is never a candidate.
pub fn discover(target: &Path, mode: TargetMode) -> Result<BatchPlan> {
    if !target.exists() {
        return Err(Error::invalid_target(target, "path does not exist"));
    }

    match mode {
        TargetMode::SingleFile => plan_single_file(target),
        TargetMode::Directory => {
            require_dir(target)?;
            let mut plan = BatchPlan::default();
            if let Some(batch) = scan_directory(&std::path::absolute(target)?)? {
                plan.directories.push(batch);
            }
            Ok(plan)
        }
        TargetMode::Recursive => {
            require_dir(target)?;
            let root = std::path::absolute(target)?;
            let mut plan = BatchPlan::default();
            let walker = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| e.file_type().is_dir());
            for entry in walker {
                let entry = entry?;
                if let Some(batch) = scan_directory(entry.path())? {
                    plan.directories.push(batch);
                }
            }
            Ok(plan)
        }
    }
}

fn plan_single_file(target: &Path) -> Result<BatchPlan> {
    if !target.is_file() {
        return Err(Error::invalid_target(target, "not a regular file"));
    }
    let source = SourceFile::new(target)?;
    // The marker itself is compiled as-is; otherwise protect a sibling marker
    let has_marker = !source.is_marker() && source.dir.join(MARKER_FILE).is_file();

    Ok(BatchPlan {
        directories: vec![DirectoryBatch {
            dir: source.dir.clone(),
            has_marker,
            candidates: vec![source],
        }],
    })
}

fn require_dir(target: &Path) -> Result<()> {
    if target.is_dir() {
        Ok(())
    } else {
        Err(Error::invalid_target(target, "not a directory"))
    }
}

fn scan_directory(dir: &Path) -> Result<Option<DirectoryBatch>> {
    let mut has_marker = false;
    let mut names = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name == MARKER_FILE {
            has_marker = true;
        } else if name.len() > SOURCE_EXTENSION.len() && name.ends_with(SOURCE_EXTENSION) {
            names.push(name);
        }
    }

    if names.is_empty() && !has_marker {
        return Ok(None);
    }

    names.sort();
    let candidates = names
        .iter()
        .map(|name| SourceFile::new(&dir.join(name)))
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(DirectoryBatch {
        dir: dir.to_path_buf(),
        has_marker,
        candidates,
    }))
}
