// tests/batch_interrupt.rs

//! Interrupt handling in the batch orchestrator.
//!
//! The interrupt flag is process-wide, so this lives in its own test binary
//! with a single test.

mod common;

use common::{VALID_SOURCE, list_dir, write_tree};
use py2pyd::{BatchOptions, BatchOrchestrator, Compiler, ConversionOutcome, SilentSink, interrupt};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Raises the interrupt flag while compiling the first file it sees
#[derive(Default)]
struct InterruptingCompiler {
    calls: Mutex<Vec<PathBuf>>,
}

impl Compiler for InterruptingCompiler {
    fn compile(&self, source: &Path) -> ConversionOutcome {
        self.calls.lock().unwrap().push(source.to_path_buf());
        assert!(!source.with_file_name("__init__.py").exists());
        interrupt::request();
        ConversionOutcome::failure("interrupted")
    }
}

#[test]
fn test_interrupt_stops_scheduling_and_restores_markers() {
    let tmp = tempfile::tempdir().unwrap();
    write_tree(
        tmp.path(),
        &[
            ("a/__init__.py", "# marker a"),
            ("a/one.py", VALID_SOURCE),
            ("a/two.py", VALID_SOURCE),
            ("b/three.py", VALID_SOURCE),
        ],
    );

    let compiler = InterruptingCompiler::default();
    let result = BatchOrchestrator::new(&compiler, &SilentSink, BatchOptions::default())
        .run(tmp.path())
        .unwrap();

    assert!(result.interrupted);
    assert!(!result.aborted);
    assert!(!result.is_success());
    assert_eq!(result.fail_count, 1);
    assert_eq!(result.failed[0].path, tmp.path().join("a/one.py"));

    // Nothing after the interrupted file was attempted
    assert_eq!(*compiler.calls.lock().unwrap(), vec![tmp.path().join("a/one.py")]);
    assert_eq!(
        fs::read_to_string(tmp.path().join("a/__init__.py")).unwrap(),
        "# marker a"
    );
    assert_eq!(list_dir(&tmp.path().join("a")), vec!["__init__.py", "one.py", "two.py"]);
    assert_eq!(list_dir(&tmp.path().join("b")), vec!["three.py"]);
}
