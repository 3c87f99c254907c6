// src/marker.rs

//! Package marker guard
//!
//! A directory's `__init__.py` is taken off disk while its siblings are
//! compiled (so the toolchain builds them as top-level modules rather than as
//! package members) and written back afterwards. Held contents are kept per
//! directory; every held marker is written back by `release_all`, which also
//! runs when the guard is dropped.

use crate::error::{Error, Result};
use crate::source::MARKER_FILE;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, warn};

/// A marker taken off disk
#[derive(Debug)]
struct HeldMarker {
    content: Vec<u8>,
    permissions: Option<fs::Permissions>,
}

/// Holds captured marker contents, keyed by directory
#[derive(Debug, Default)]
pub struct MarkerGuard {
    held: Mutex<HashMap<PathBuf, HeldMarker>>,
}

impl MarkerGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn held(&self) -> MutexGuard<'_, HashMap<PathBuf, HeldMarker>> {
        // A poisoned map still holds valid marker contents
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the marker in `dir` off disk and keep its content
    ///
    /// Returns `Ok(true)` if a marker was captured, `Ok(false)` if this
    /// directory's marker is already held or there is none on disk.
    pub fn capture(&self, dir: &Path) -> Result<bool> {
        let mut held = self.held();
        if held.contains_key(dir) {
            debug!("Marker in {} already held", dir.display());
            return Ok(false);
        }

        let marker = dir.join(MARKER_FILE);
        let content = match fs::read(&marker) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(Error::MarkerCapture {
                    dir: dir.to_path_buf(),
                    source,
                });
            }
        };

        let permissions = fs::metadata(&marker).ok().map(|m| m.permissions());

        fs::remove_file(&marker).map_err(|source| Error::MarkerCapture {
            dir: dir.to_path_buf(),
            source,
        })?;

        debug!("Captured {} ({} bytes)", marker.display(), content.len());
        held.insert(
            dir.to_path_buf(),
            HeldMarker {
                content,
                permissions,
            },
        );
        Ok(true)
    }

    /// Write the held marker for `dir` back to disk
    ///
    /// Returns `Ok(false)` if nothing was held for `dir`. On failure the
    /// content is saved to a rescue file and `Error::MarkerRestore` names it.
    pub fn release(&self, dir: &Path) -> Result<bool> {
        let Some(marker) = self.held().remove(dir) else {
            return Ok(false);
        };

        match write_marker(dir, &marker) {
            Ok(()) => {
                debug!("Restored {}", dir.join(MARKER_FILE).display());
                Ok(true)
            }
            Err(source) => {
                let rescue = save_rescue_copy(&marker.content);
                error!(
                    "Cannot restore {} in {}: {}",
                    MARKER_FILE,
                    dir.display(),
                    source
                );
                Err(Error::MarkerRestore {
                    dir: dir.to_path_buf(),
                    rescue,
                    source,
                })
            }
        }
    }

    /// Restore every held marker; the first failure is returned after all were tried
    pub fn release_all(&self) -> Result<()> {
        let mut dirs: Vec<PathBuf> = self.held().keys().cloned().collect();
        dirs.sort();

        let mut first_err = None;
        for dir in dirs {
            if let Err(e) = self.release(&dir) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Number of markers currently off disk
    pub fn held_count(&self) -> usize {
        self.held().len()
    }
}

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        if self.held_count() > 0 {
            warn!("Restoring {} package marker(s) on shutdown", self.held_count());
            if let Err(e) = self.release_all() {
                error!("{}", e);
            }
        }
    }
}

/// Atomically write a held marker back into `dir`
fn write_marker(dir: &Path, marker: &HeldMarker) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".py2pyd-marker-")
        .tempfile_in(dir)?;
    tmp.write_all(&marker.content)?;
    if let Some(permissions) = &marker.permissions {
        tmp.as_file().set_permissions(permissions.clone())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(dir.join(MARKER_FILE)).map_err(|e| e.error)?;
    Ok(())
}

fn save_rescue_copy(content: &[u8]) -> Option<PathBuf> {
    let attempt = || -> std::io::Result<PathBuf> {
        let mut tmp = tempfile::Builder::new()
            .prefix("py2pyd-rescue-")
            .suffix("__init__.py")
            .tempfile()?;
        tmp.write_all(content)?;
        let (_, path) = tmp.keep().map_err(|e| e.error)?;
        Ok(path)
    };

    match attempt() {
        Ok(path) => {
            warn!("Saved marker content to {}", path.display());
            Some(path)
        }
        Err(e) => {
            error!("Cannot save rescue copy of package marker: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_release_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(MARKER_FILE);
        fs::write(&marker, b"# init\n\xff\x00binary").unwrap();

        let guard = MarkerGuard::new();
        assert!(guard.capture(tmp.path()).unwrap());
        assert!(!marker.exists());
        assert_eq!(guard.held_count(), 1);

        assert!(guard.release(tmp.path()).unwrap());
        assert_eq!(fs::read(&marker).unwrap(), b"# init\n\xff\x00binary");
        assert_eq!(guard.held_count(), 0);
    }

    #[test]
    fn test_double_capture_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MARKER_FILE), "# init").unwrap();

        let guard = MarkerGuard::new();
        assert!(guard.capture(tmp.path()).unwrap());
        // A new marker appearing mid-pass must not replace the held content
        fs::write(tmp.path().join(MARKER_FILE), "# other").unwrap();
        assert!(!guard.capture(tmp.path()).unwrap());

        guard.release(tmp.path()).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join(MARKER_FILE)).unwrap(), "# init");
    }

    #[test]
    fn test_capture_without_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let guard = MarkerGuard::new();
        assert!(!guard.capture(tmp.path()).unwrap());
        assert!(!guard.release(tmp.path()).unwrap());
    }

    #[test]
    fn test_independent_directories() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join(MARKER_FILE), "a").unwrap();
        fs::write(b.path().join(MARKER_FILE), "b").unwrap();

        let guard = MarkerGuard::new();
        guard.capture(a.path()).unwrap();
        guard.capture(b.path()).unwrap();
        assert_eq!(guard.held_count(), 2);

        guard.release_all().unwrap();
        assert_eq!(fs::read_to_string(a.path().join(MARKER_FILE)).unwrap(), "a");
        assert_eq!(fs::read_to_string(b.path().join(MARKER_FILE)).unwrap(), "b");
    }

    #[test]
    fn test_drop_restores_markers() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(MARKER_FILE), "# keep me").unwrap();

        {
            let guard = MarkerGuard::new();
            guard.capture(tmp.path()).unwrap();
            assert!(!tmp.path().join(MARKER_FILE).exists());
        }

        assert_eq!(
            fs::read_to_string(tmp.path().join(MARKER_FILE)).unwrap(),
            "# keep me"
        );
    }

    #[test]
    fn test_release_into_removed_directory_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("pkg");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join(MARKER_FILE), "# lost?").unwrap();

        let guard = MarkerGuard::new();
        guard.capture(&dir).unwrap();
        fs::remove_dir(&dir).unwrap();

        let err = guard.release(&dir).unwrap_err();
        assert!(err.is_marker_loss());
        match err {
            Error::MarkerRestore { rescue: Some(rescue), .. } => {
                assert_eq!(fs::read_to_string(&rescue).unwrap(), "# lost?");
                fs::remove_file(rescue).unwrap();
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(guard.held_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_restore_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join(MARKER_FILE);
        fs::write(&marker, "").unwrap();
        fs::set_permissions(&marker, fs::Permissions::from_mode(0o644)).unwrap();

        let guard = MarkerGuard::new();
        guard.capture(tmp.path()).unwrap();
        guard.release(tmp.path()).unwrap();

        let mode = fs::metadata(&marker).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
