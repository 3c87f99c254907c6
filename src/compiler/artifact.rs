// src/compiler/artifact.rs

//! Locating the tagged extension the toolchain produced and renaming it
//!
//! setuptools names in-place builds `<stem><EXT_SUFFIX>`, where the suffix
//! carries an ABI/platform tag (`a.cpython-311-x86_64-linux-gnu.so`,
//! `a.cp311-win_amd64.pyd`). The final artifact is always `<stem><ext>` so
//! repeated runs converge on the same file name.

use crate::error::{Error, Result};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Slack for filesystems with coarse modification times
const MTIME_SLACK: Duration = Duration::from_secs(2);

/// Canonical artifact path for a module
pub fn canonical_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}{}", stem, ext))
}

/// Find the artifact produced for `stem` in `dir`
///
/// Tagged candidates match `<stem>.*<ext>` and are sorted; the first one wins.
/// Without a tagged candidate, a canonical file modified at or after `started`
/// is accepted (a toolchain that writes untagged names).
pub fn locate(dir: &Path, stem: &str, ext: &str, started: SystemTime) -> Result<Option<PathBuf>> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| Error::Compile(format!("directory is not valid UTF-8: {}", dir.display())))?;
    let pattern = format!(
        "{}/{}.*{}",
        Pattern::escape(dir_str),
        Pattern::escape(stem),
        Pattern::escape(ext)
    );

    let mut matches: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    matches.sort();

    if matches.len() > 1 {
        warn!(
            "{} extension candidates for {}, using {}",
            matches.len(),
            stem,
            matches[0].display()
        );
    }
    if let Some(found) = matches.into_iter().next() {
        debug!("Located artifact {}", found.display());
        return Ok(Some(found));
    }

    let canonical = canonical_path(dir, stem, ext);
    let threshold = started.checked_sub(MTIME_SLACK).unwrap_or(started);
    let fresh = fs::metadata(&canonical)
        .and_then(|m| m.modified())
        .map(|mtime| mtime >= threshold)
        .unwrap_or(false);
    Ok(fresh.then_some(canonical))
}

/// Move `found` to the canonical name, replacing any earlier artifact
pub fn install_canonical(found: &Path, dir: &Path, stem: &str, ext: &str) -> Result<PathBuf> {
    let canonical = canonical_path(dir, stem, ext);
    if found == canonical {
        return Ok(canonical);
    }

    match fs::remove_file(&canonical) {
        Ok(()) => debug!("Replaced previous artifact {}", canonical.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    fs::rename(found, &canonical)?;
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_locate_tagged_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.cpython-311-x86_64-linux-gnu.so"), "bin");
        touch(&tmp.path().join("a.py"), "src");

        let found = locate(tmp.path(), "a", ".so", SystemTime::now()).unwrap();
        assert_eq!(found, Some(tmp.path().join("a.cpython-311-x86_64-linux-gnu.so")));
    }

    #[test]
    fn test_locate_ignores_prefix_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("ab.cpython-311-x86_64-linux-gnu.so"), "other module");

        let found = locate(tmp.path(), "a", ".so", SystemTime::now()).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_locate_tie_break_is_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("m.cpython-312-x86_64-linux-gnu.so"), "312");
        touch(&tmp.path().join("m.cpython-311-x86_64-linux-gnu.so"), "311");

        for _ in 0..3 {
            let found = locate(tmp.path(), "m", ".so", SystemTime::now()).unwrap();
            assert_eq!(found, Some(tmp.path().join("m.cpython-311-x86_64-linux-gnu.so")));
        }
    }

    #[test]
    fn test_stale_canonical_is_not_an_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("a.so"), "old build");

        let later = SystemTime::now() + Duration::from_secs(60);
        assert_eq!(locate(tmp.path(), "a", ".so", later).unwrap(), None);

        let earlier = SystemTime::now() - Duration::from_secs(60);
        assert_eq!(
            locate(tmp.path(), "a", ".so", earlier).unwrap(),
            Some(tmp.path().join("a.so"))
        );
    }

    #[test]
    fn test_locate_escapes_glob_characters() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("odd [dir]");
        fs::create_dir(&dir).unwrap();
        touch(&dir.join("m.cpython-311.so"), "bin");

        let found = locate(&dir, "m", ".so", SystemTime::now()).unwrap();
        assert_eq!(found, Some(dir.join("m.cpython-311.so")));
    }

    #[test]
    fn test_install_canonical_replaces_previous() {
        let tmp = tempfile::tempdir().unwrap();
        let tagged = tmp.path().join("a.cpython-311-x86_64-linux-gnu.so");
        touch(&tmp.path().join("a.so"), "old");
        touch(&tagged, "new");

        let canonical = install_canonical(&tagged, tmp.path(), "a", ".so").unwrap();
        assert_eq!(canonical, tmp.path().join("a.so"));
        assert_eq!(fs::read_to_string(&canonical).unwrap(), "new");
        assert!(!tagged.exists());
    }
}
