// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request temporary work directories.
//!
//! Each download request gets one uniquely-named directory under the
//! configured root, exclusively owned by that job execution. Removal must
//! happen on every exit path: the explicit [`WorkDir::cleanup`] call retries
//! around filesystem races with the extractor process exiting, and the Drop
//! implementation is the crash-path last resort.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clipfetch_core::ClipfetchError;
use tracing::{debug, warn};

const CLEANUP_RETRIES: u32 = 3;
const CLEANUP_BACKOFF: Duration = Duration::from_millis(100);

/// A uniquely-named temp directory owned by one job execution.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    cleaned: bool,
}

impl WorkDir {
    /// Creates a fresh directory under `root`, creating `root` itself if
    /// needed.
    pub async fn create(root: &Path) -> Result<WorkDir, ClipfetchError> {
        let path = root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&path).await?;
        debug!(path = %path.display(), "created work directory");
        Ok(WorkDir {
            path,
            cleaned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory and everything in it.
    ///
    /// Retried with short backoff because the extractor process may still
    /// be releasing files as it exits. Failures are logged, never
    /// propagated; a stale directory is the sweeper's problem, not the
    /// job's.
    pub async fn cleanup(self) {
        self.cleanup_with(|p| std::fs::remove_dir_all(p)).await;
    }

    async fn cleanup_with<F>(mut self, mut remove: F)
    where
        F: FnMut(&Path) -> std::io::Result<()>,
    {
        self.cleaned = true;
        for attempt in 1..=CLEANUP_RETRIES {
            match remove(&self.path) {
                Ok(()) => {
                    debug!(path = %self.path.display(), "removed work directory");
                    return;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        attempt,
                        error = %e,
                        "work directory removal failed"
                    );
                    tokio::time::sleep(CLEANUP_BACKOFF * attempt).await;
                }
            }
        }
        // Forceful last pass: strip read-only bits, then remove whatever
        // is left.
        force_remove(&self.path);
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if !self.cleaned {
            // Crash path. Synchronous best effort only.
            if let Err(e) = std::fs::remove_dir_all(&self.path)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                warn!(path = %self.path.display(), error = %e, "drop-path work directory removal failed");
            }
        }
    }
}

fn force_remove(path: &Path) {
    // A non-writable directory blocks unlinking its entries, so the top
    // directory gets its write bit back first.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700));
    }
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = std::fs::set_permissions(&entry_path, std::fs::Permissions::from_mode(0o700));
            }
            let _ = if entry_path.is_dir() {
                std::fs::remove_dir_all(&entry_path)
            } else {
                std::fs::remove_file(&entry_path)
            };
        }
    }
    if let Err(e) = std::fs::remove_dir_all(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "forceful work directory removal failed");
    }
}
