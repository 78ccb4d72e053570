// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic resource sweepers.
//!
//! Two hygiene passes run on a timer: removal of work directories that
//! out-lived their job (drop-path cleanup can be defeated by a hard crash)
//! and termination of extractor processes that escaped their invocation's
//! process-group kill. Both are best effort; failures are logged and the
//! next tick tries again.

use std::path::Path;
use std::time::{Duration, SystemTime};

use clipfetch_config::model::SweepConfig;
use tracing::{debug, info, warn};

/// Removes subdirectories of `root` older than `max_age`.
///
/// Returns the number of directories removed.
pub async fn sweep_stale_workdirs(root: &Path, max_age: Duration) -> usize {
    let mut removed = 0;
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        // Root not existing yet just means no job has run.
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            warn!(root = %root.display(), error = %e, "cannot read temp root for sweep");
            return 0;
        }
    };

    let now = SystemTime::now();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        let Some(age) = age else { continue };
        if age < max_age {
            continue;
        }
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {
                info!(path = %path.display(), age_secs = age.as_secs(), "swept stale work directory");
                removed += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to sweep stale work directory");
            }
        }
    }
    removed
}

/// Kills extractor processes older than `max_age`.
///
/// Scans `/proc` for processes whose command name matches the extractor
/// and SIGKILLs any that have been alive longer than a job could
/// legitimately run. Returns the number of processes killed.
#[cfg(unix)]
pub fn sweep_runaway_extractors(max_age: Duration) -> usize {
    let mut killed = 0;
    let entries = match std::fs::read_dir("/proc") {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "cannot read /proc for extractor sweep");
            return 0;
        }
    };

    let now = SystemTime::now();
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<i32>().ok())
        else {
            continue;
        };

        let comm_path = entry.path().join("comm");
        let Ok(comm) = std::fs::read_to_string(&comm_path) else {
            continue;
        };
        if comm.trim() != crate::binary::EXTRACTOR_NAME {
            continue;
        }

        // /proc/<pid> mtime approximates process start well enough for a
        // coarse age check.
        let age = std::fs::metadata(entry.path())
            .and_then(|m| m.modified())
            .ok()
            .and_then(|started| now.duration_since(started).ok());
        let Some(age) = age else { continue };
        if age < max_age {
            continue;
        }

        warn!(pid, age_secs = age.as_secs(), "killing runaway extractor process");
        unsafe {
            libc::kill(pid, libc::SIGKILL);
        }
        killed += 1;
    }
    killed
}

#[cfg(not(unix))]
pub fn sweep_runaway_extractors(_max_age: Duration) -> usize {
    0
}

/// Spawns the periodic sweep loop. Runs until the task is aborted at
/// shutdown.
pub fn spawn_sweeper(temp_root: std::path::PathBuf, config: SweepConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let removed = sweep_stale_workdirs(
                &temp_root,
                Duration::from_secs(config.workdir_max_age_secs),
            )
            .await;
            let killed = sweep_runaway_extractors(Duration::from_secs(config.process_max_age_secs));
            debug!(removed, killed, "sweep tick complete");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn old_dir(root: &Path, name: &str) -> PathBuf {
        let path = root.join(name);
        std::fs::create_dir(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn fresh_directories_survive_the_sweep() {
        let root = tempfile::tempdir().unwrap();
        let fresh = old_dir(root.path(), "fresh");
        std::fs::write(fresh.join("clip.mp4"), b"data").unwrap();

        let removed = sweep_stale_workdirs(root.path(), Duration::from_secs(3600)).await;
        assert_eq!(removed, 0);
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn old_directories_are_removed() {
        let root = tempfile::tempdir().unwrap();
        let stale = old_dir(root.path(), "stale");

        // Zero max age makes every directory stale.
        let removed = sweep_stale_workdirs(root.path(), Duration::ZERO).await;
        assert_eq!(removed, 1);
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn plain_files_in_the_root_are_left_alone() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("note.txt");
        std::fs::write(&file, b"keep me").unwrap();

        let removed = sweep_stale_workdirs(root.path(), Duration::ZERO).await;
        assert_eq!(removed, 0);
        assert!(file.exists());
    }

    #[tokio::test]
    async fn missing_root_is_not_an_error() {
        let removed =
            sweep_stale_workdirs(Path::new("/nonexistent/clipfetch-root"), Duration::ZERO).await;
        assert_eq!(removed, 0);
    }
}
