// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use py2pyd::compiler::canonical_path;
use py2pyd::{Compiler, ConversionOutcome, MARKER_FILE};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

/// Source content the fake toolchains reject with a diagnostic
pub const SYNTAX_ERROR: &str = "def broken(:\n    pass  # SYNTAX ERROR\n";
/// Valid-looking module source
pub const VALID_SOURCE: &str = "def add(a, b):\n    return a + b\n";

/// Create files under `root`; parent directories are created as needed.
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

/// Sorted file names directly inside `dir`.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

/// In-process compiler: writes `<stem>.so` unless the source contains
/// "SYNTAX ERROR". Records every call and whether a package marker was
/// visible next to the file being compiled.
#[derive(Default)]
pub struct FakeCompiler {
    pub calls: Mutex<Vec<PathBuf>>,
    pub marker_seen: AtomicBool,
}

impl FakeCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl Compiler for FakeCompiler {
    fn compile(&self, source: &Path) -> ConversionOutcome {
        self.calls.lock().unwrap().push(source.to_path_buf());

        let dir = source.parent().unwrap();
        if dir.join(MARKER_FILE).exists() {
            self.marker_seen.store(true, Ordering::SeqCst);
        }

        let content = match fs::read_to_string(source) {
            Ok(content) => content,
            Err(e) => return ConversionOutcome::failure(e.to_string()),
        };
        if content.contains("SYNTAX ERROR") {
            return ConversionOutcome::failure("compile failed:\nSyntax error");
        }

        let stem = source.file_stem().unwrap().to_str().unwrap();
        let artifact = canonical_path(dir, stem, ".so");
        fs::write(&artifact, format!("compiled:{}", content)).unwrap();
        ConversionOutcome::success(artifact)
    }
}

/// Compiler that deletes the directory of the file it is given.
pub struct DirRemovingCompiler;

impl Compiler for DirRemovingCompiler {
    fn compile(&self, source: &Path) -> ConversionOutcome {
        fs::remove_dir_all(source.parent().unwrap()).unwrap();
        ConversionOutcome::failure("directory vanished")
    }
}

/// Shell script standing in for a Python interpreter with Cython.
///
/// `-c <probe>` prints probe output. In build mode it reads `PY2PYD_MODULE`
/// and `PY2PYD_SOURCE` and behaves according to markers in the source text:
/// `RMDIR` deletes the working directory, taking any held marker's home
/// with it.
#[cfg(unix)]
const FAKE_PYTHON: &str = r#"#!/bin/sh
if [ "$1" = "-c" ]; then
  echo "python=3.11.4"
  echo "prefix=${FAKE_PREFIX:-/usr}"
  echo "cython=3.0.10"
  exit 0
fi
[ -f "$1" ] || { echo "build script missing: $1" >&2; exit 9; }
[ "$2" = "build_ext" ] && [ "$3" = "--inplace" ] || { echo "bad arguments: $*" >&2; exit 8; }
mod="$PY2PYD_MODULE"
src="$PY2PYD_SOURCE"
if grep -q "SYNTAX ERROR" "$src"; then
  echo "$mod.py:1:12: Expected an identifier" >&2
  exit 1
fi
if grep -q "SILENT FAIL" "$src"; then exit 1; fi
if grep -q "NO ARTIFACT" "$src"; then exit 0; fi
if grep -q "HANG" "$src"; then exec sleep 30; fi
if grep -q "RMDIR" "$src"; then d="$PWD"; cd /; rm -rf "$d"; exit 1; fi
if [ -f __init__.py ]; then
  echo "package marker visible during build" >&2
  exit 3
fi
echo "/* generated */" > "$mod.c"
mkdir -p build/temp.linux-x86_64-cpython-311
mkdir -p __pycache__
printf 'ELF:%s\n' "$mod" > "$mod.cpython-311-x86_64-linux-gnu.so"
echo "building '$mod' extension"
exit 0
"#;

/// Interpreter whose probe reports no Cython installation
#[cfg(unix)]
const FAKE_PYTHON_NO_CYTHON: &str = r#"#!/bin/sh
echo "python=3.12.1"
echo "prefix=/opt/conda/envs/bare"
echo "cython="
"#;

/// Directory holding the fake interpreters, written once per test binary.
#[cfg(unix)]
fn fake_bin_dir() -> &'static Path {
    use std::os::unix::fs::PermissionsExt;

    static BIN: OnceLock<TempDir> = OnceLock::new();
    BIN.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, script) in [
            ("python3", FAKE_PYTHON),
            ("python3-nocython", FAKE_PYTHON_NO_CYTHON),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, script).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
        }
        dir
    })
    .path()
}

/// Fake interpreter with a working Cython
#[cfg(unix)]
pub fn fake_python() -> PathBuf {
    fake_bin_dir().join("python3")
}

/// Fake interpreter without Cython
#[cfg(unix)]
pub fn fake_python_without_cython() -> PathBuf {
    fake_bin_dir().join("python3-nocython")
}
