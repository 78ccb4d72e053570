// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded execution of the external extractor process.
//!
//! Every invocation runs with a sanitized environment (explicit PATH only),
//! its working directory pinned to the job's work directory, and its own
//! process group. Both a wall-clock timeout and an idle timeout (time since
//! the process last produced output) are enforced; on expiry the whole
//! process group gets SIGTERM, a 500ms grace period, then SIGKILL. The
//! termination path runs via a guard object so it executes even when the
//! calling strategy returns early with an error.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clipfetch_core::ClipfetchError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// PATH handed to the child; nothing else from our environment leaks in.
const SANITIZED_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Grace period between SIGTERM and SIGKILL.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Maximum captured lines per stream; older lines are dropped.
const MAX_CAPTURED_LINES: usize = 200;

/// Captured output of one bounded extractor run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Kills the child's process group unless disarmed.
///
/// Dropping the guard (any exit path, including panics in the caller)
/// performs a best-effort TERM-then-KILL of the group so no orphaned
/// extractor children survive the invocation.
struct TerminationGuard {
    pid: Option<u32>,
    armed: bool,
}

impl TerminationGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid, armed: true }
    }

    /// The process exited on its own; nothing to kill.
    fn disarm(&mut self) {
        self.armed = false;
    }

    /// Graceful termination: TERM the group, wait out the grace period,
    /// then KILL unconditionally.
    async fn terminate(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Some(pid) = self.pid {
            signal_group(pid, TermSignal::Term);
            tokio::time::sleep(KILL_GRACE).await;
            signal_group(pid, TermSignal::Kill);
        }
    }
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        if self.armed
            && let Some(pid) = self.pid
        {
            // Last-resort synchronous path; no grace period here.
            signal_group(pid, TermSignal::Term);
            signal_group(pid, TermSignal::Kill);
        }
    }
}

enum TermSignal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: TermSignal) {
    let sig = match signal {
        TermSignal::Term => libc::SIGTERM,
        TermSignal::Kill => libc::SIGKILL,
    };
    // Negative pid signals the entire process group.
    unsafe {
        libc::kill(-(pid as i32), sig);
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _signal: TermSignal) {}

/// Runs the extractor with the given arguments, bounded by `wall_timeout`
/// and `idle_timeout`.
pub async fn run_extractor(
    binary: &std::path::Path,
    args: &[String],
    work_dir: &std::path::Path,
    wall_timeout: Duration,
    idle_timeout: Duration,
) -> Result<ProcessOutput, ClipfetchError> {
    let mut cmd = tokio::process::Command::new(binary);
    cmd.args(args)
        .current_dir(work_dir)
        .env_clear()
        .env("PATH", SANITIZED_PATH)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            // Own process group so the group kill cannot touch the parent.
            libc::setpgid(0, 0);
            Ok(())
        });
    }

    debug!(binary = %binary.display(), args = ?args, "spawning extractor");

    let mut child = cmd.spawn().map_err(|e| ClipfetchError::Process {
        message: format!("failed to spawn `{}`: {e}", binary.display()),
        source: Some(Box::new(e)),
    })?;

    let mut guard = TerminationGuard::new(child.id());

    let last_activity = Arc::new(Mutex::new(Instant::now()));
    let stdout_lines = Arc::new(Mutex::new(Vec::new()));
    let stderr_lines = Arc::new(Mutex::new(Vec::new()));

    let stdout_task = child
        .stdout
        .take()
        .map(|stream| tokio::spawn(capture_stream(stream, stdout_lines.clone(), last_activity.clone())));
    let stderr_task = child
        .stderr
        .take()
        .map(|stream| tokio::spawn(capture_stream(stream, stderr_lines.clone(), last_activity.clone())));

    let deadline = Instant::now() + wall_timeout;

    // Poll for exit; on either timeout, terminate the group and reap.
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                let now = Instant::now();
                let idle = {
                    let last = last_activity.lock().unwrap_or_else(|e| e.into_inner());
                    now.duration_since(*last)
                };
                if now >= deadline || idle >= idle_timeout {
                    let exceeded = if now >= deadline { wall_timeout } else { idle_timeout };
                    warn!(
                        binary = %binary.display(),
                        wall = now >= deadline,
                        "extractor timed out, terminating process group"
                    );
                    guard.terminate().await;
                    let _ = child.wait().await; // reap
                    return Err(ClipfetchError::Timeout { duration: exceeded });
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            Err(e) => {
                guard.terminate().await;
                return Err(ClipfetchError::Process {
                    message: format!("failed to wait for extractor: {e}"),
                    source: Some(Box::new(e)),
                });
            }
        }
    };

    guard.disarm();

    if let Some(task) = stdout_task {
        let _ = task.await;
    }
    if let Some(task) = stderr_task {
        let _ = task.await;
    }

    let stdout = join_lines(&stdout_lines);
    let stderr = join_lines(&stderr_lines);

    debug!(success = status.success(), code = ?status.code(), "extractor exited");

    Ok(ProcessOutput {
        success: status.success(),
        stdout,
        stderr,
    })
}

/// Reads a child stream line by line, keeping a bounded tail and bumping
/// the activity timestamp for the idle timeout.
async fn capture_stream<R>(
    stream: R,
    lines: Arc<Mutex<Vec<String>>>,
    last_activity: Arc<Mutex<Instant>>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream).lines();
    while let Ok(Some(line)) = reader.next_line().await {
        {
            let mut last = last_activity.lock().unwrap_or_else(|e| e.into_inner());
            *last = Instant::now();
        }
        let mut buf = lines.lock().unwrap_or_else(|e| e.into_inner());
        if buf.len() >= MAX_CAPTURED_LINES {
            buf.remove(0);
        }
        buf.push(line);
    }
}

fn join_lines(lines: &Arc<Mutex<Vec<String>>>) -> String {
    lines.lock().unwrap_or_else(|e| e.into_inner()).join("\n")
}
