// src/process.rs

//! Bounded subprocess execution
//!
//! Toolchain invocations are blocking from the caller's point of view but
//! never unbounded: the child is killed once the timeout expires or an
//! interrupt is requested. Both output pipes are drained on reader threads so
//! a chatty compiler cannot fill a pipe buffer and stall until the timeout.
//!
//! On Unix the child leads its own process group, so the compilers that
//! setuptools spawns are killed along with it, and a terminal Ctrl-C reaches
//! only py2pyd.

use crate::error::{Error, Result};
use crate::interrupt;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// How often a running child is checked for an interrupt request
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Output of a finished subprocess
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Standard output and standard error joined, trimmed
    pub fn combined(&self) -> String {
        let stdout = self.stdout.trim();
        let stderr = self.stderr.trim();
        match (stdout.is_empty(), stderr.is_empty()) {
            (true, true) => String::new(),
            (false, true) => stdout.to_string(),
            (true, false) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stdout, stderr),
        }
    }
}

/// Run a command to completion, killing it after `timeout`
///
/// stdin is always null. A spawn failure is an IO error; a timeout is
/// `Error::Timeout` and an interrupt request is `Error::Interrupted`. A
/// non-zero exit is *not* an error here, callers inspect
/// `CapturedOutput::status`.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<CapturedOutput> {
    debug!("Running {:?} (timeout {}s)", command, timeout.as_secs());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let stopped = loop {
        if interrupt::is_requested() {
            break Error::Interrupted;
        }
        let now = Instant::now();
        if now >= deadline {
            break Error::Timeout(timeout.as_secs());
        }
        if let Some(status) = child.wait_timeout((deadline - now).min(POLL_INTERVAL))? {
            return Ok(CapturedOutput {
                status,
                stdout: collect(stdout_reader),
                stderr: collect(stderr_reader),
            });
        }
    };

    kill(&mut child);
    // Anything that escaped the process group may still hold the pipes
    // open; the reader threads are left detached rather than joined.
    drop(stdout_reader);
    drop(stderr_reader);
    Err(stopped)
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Kill the child's whole process group, falling back to the child alone
#[cfg(unix)]
fn kill(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let group = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(group, Signal::SIGKILL) {
        debug!("killpg({}) failed: {}; killing the child only", group, e);
        if let Err(e) = child.kill() {
            warn!("Failed to kill process {}: {}", child.id(), e);
        }
    }
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill process {}: {}", child.id(), e);
    }
    let _ = child.wait();
}
