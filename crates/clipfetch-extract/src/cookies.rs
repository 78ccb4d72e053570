// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cookie jar management for authenticated extraction attempts.
//!
//! Operators point the config at one or more Netscape-format cookie files
//! exported from logged-in browser sessions. Strategies rotate through the
//! usable jars in order; a missing or empty file is skipped with a warning
//! rather than failing the run.

use std::path::{Path, PathBuf};

use tracing::warn;

/// The set of configured cookie jars.
#[derive(Debug, Clone, Default)]
pub struct CookieSet {
    paths: Vec<PathBuf>,
}

impl CookieSet {
    pub fn from_paths(paths: Vec<String>) -> Self {
        Self {
            paths: paths.into_iter().map(PathBuf::from).collect(),
        }
    }

    /// Number of jars in the configuration, usable or not.
    pub fn configured_len(&self) -> usize {
        self.paths.len()
    }

    /// Jars that exist and are non-empty, in configured order.
    pub fn usable(&self) -> Vec<&Path> {
        self.paths
            .iter()
            .filter(|path| match std::fs::metadata(path) {
                Ok(meta) if meta.is_file() && meta.len() > 0 => true,
                Ok(_) => {
                    warn!(path = %path.display(), "cookie file is empty, skipping");
                    false
                }
                Err(_) => {
                    warn!(path = %path.display(), "cookie file missing, skipping");
                    false
                }
            })
            .map(PathBuf::as_path)
            .collect()
    }
}

/// Reconstitutes a `Cookie:` header value from a Netscape-format jar,
/// keeping only cookies scoped to `domain` (or its parent domains).
///
/// Lines are tab-separated with seven fields; the cookie name and value are
/// the last two. Comment lines and short lines are ignored.
pub fn cookie_header_from_jar(jar: &Path, domain: &str) -> Option<String> {
    let contents = std::fs::read_to_string(jar).ok()?;
    let mut pairs = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }
        let cookie_domain = fields[0].trim_start_matches('.');
        if !domain.ends_with(cookie_domain) {
            continue;
        }
        let name = fields[5];
        let value = fields[6];
        if !name.is_empty() {
            pairs.push(format!("{name}={value}"));
        }
    }
    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
