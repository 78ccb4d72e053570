// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The strategy cascade.
//!
//! Each platform contributes an ordered list of [`ExtractionStrategy`]
//! implementations, cheapest and most reliable first. The cascade runs them
//! in order and short-circuits on the first one that yields at least one
//! media file; a failing or empty strategy is logged at warn level and the
//! next one runs. Only when every strategy has failed does an error leave
//! the engine.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use clipfetch_core::{ClipfetchError, ExtractionResult, MediaFile, ValidatedUrl};
use tracing::{info, warn};

use crate::cookies::CookieSet;
use crate::process::{self, ProcessOutput};

/// Shared read-only context handed to every strategy attempt.
pub struct StrategyContext<'a> {
    pub url: &'a ValidatedUrl,
    pub work_dir: &'a Path,
    pub binary: &'a Path,
    pub cookies: &'a CookieSet,
    pub timeout: Duration,
    pub http: &'a reqwest::Client,
}

/// One way of turning a URL into local media files.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Short label used in logs and carried on the extraction result.
    fn label(&self) -> &str;

    /// Attempts extraction into `ctx.work_dir`. Returning an empty vec is
    /// treated the same as an error by the cascade.
    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError>;
}

/// Runs strategies in order until one produces media.
pub async fn run_cascade(
    strategies: &[Box<dyn ExtractionStrategy>],
    ctx: &StrategyContext<'_>,
) -> Result<ExtractionResult, ClipfetchError> {
    let total = strategies.len();
    for (index, strategy) in strategies.iter().enumerate() {
        let label = strategy.label();
        info!(
            strategy = label,
            position = index + 1,
            total,
            url = %ctx.url,
            "attempting extraction strategy"
        );
        match strategy.attempt(ctx).await {
            Ok(files) if !files.is_empty() => {
                info!(strategy = label, files = files.len(), "extraction strategy succeeded");
                return Ok(ExtractionResult {
                    files,
                    strategy: label.to_string(),
                });
            }
            Ok(_) => {
                warn!(strategy = label, "strategy produced no media files, trying next");
            }
            Err(e) => {
                warn!(strategy = label, error = %e, "strategy failed, trying next");
            }
        }
    }

    Err(ClipfetchError::StrategiesExhausted {
        url: ctx.url.to_string(),
    })
}

/// Scans a work directory and classifies its contents as media files.
///
/// Zero-byte files and unrecognized extensions (sidecars, partial
/// downloads) are skipped. Results are sorted by file name so delivery
/// order is stable for carousels.
pub fn collect_media_files(dir: &Path) -> Result<Vec<MediaFile>, ClipfetchError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let size = entry.metadata()?.len();
        if size == 0 {
            warn!(path = %path.display(), "skipping zero-byte output file");
            continue;
        }
        if let Some(file) = MediaFile::classify(path) {
            files.push(file);
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Invokes the extractor binary and, when it fails, maps the stderr tail
/// into a strategy error so the classifier can see the extractor's words.
pub async fn run_extractor_step(
    label: &str,
    args: &[String],
    ctx: &StrategyContext<'_>,
) -> Result<ProcessOutput, ClipfetchError> {
    // Idle timeout is a fraction of the wall budget; a healthy download
    // prints progress far more often than this.
    let idle = ctx.timeout.min(Duration::from_secs(30));
    let output = process::run_extractor(ctx.binary, args, ctx.work_dir, ctx.timeout, idle).await?;
    if !output.success {
        return Err(ClipfetchError::Strategy {
            strategy: label.to_string(),
            message: stderr_tail(&output.stderr),
        });
    }
    Ok(output)
}

/// Last few stderr lines, which is where the extractor puts its ERROR line.
pub fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().rev().take(5).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join("\n")
}
