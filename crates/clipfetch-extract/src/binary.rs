// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extractor binary resolution.
//!
//! Resolution order: configured path (must exist and be executable), then a
//! PATH scan, then a fixed list of common install locations. Failure is
//! fatal for the call; the job layer decides what that means for the user.

use std::path::{Path, PathBuf};

use clipfetch_core::ClipfetchError;
use tracing::debug;

/// Default binary name searched on PATH.
pub const EXTRACTOR_NAME: &str = "yt-dlp";

/// Common install locations checked after PATH.
const FALLBACK_LOCATIONS: &[&str] = &[
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
    "/opt/homebrew/bin/yt-dlp",
];

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolves the extractor binary to an executable path.
pub fn resolve_extractor(configured: Option<&str>) -> Result<PathBuf, ClipfetchError> {
    if let Some(configured) = configured {
        let path = PathBuf::from(configured);
        if is_executable(&path) {
            debug!(path = %path.display(), "using configured extractor binary");
            return Ok(path);
        }
        return Err(ClipfetchError::ExtractorNotFound(format!(
            "configured path `{configured}` is not an executable file"
        )));
    }

    if let Some(path) = search_path(EXTRACTOR_NAME) {
        debug!(path = %path.display(), "found extractor on PATH");
        return Ok(path);
    }

    // ~/.local/bin is a common pipx target not always on the service PATH.
    let mut candidates: Vec<PathBuf> = FALLBACK_LOCATIONS.iter().map(PathBuf::from).collect();
    if let Some(home) = dirs_home() {
        candidates.push(home.join(".local/bin").join(EXTRACTOR_NAME));
    }

    for candidate in candidates {
        if is_executable(&candidate) {
            debug!(path = %candidate.display(), "found extractor in fallback location");
            return Ok(candidate);
        }
    }

    Err(ClipfetchError::ExtractorNotFound(format!(
        "`{EXTRACTOR_NAME}` not found in configuration, PATH, or common install locations"
    )))
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
