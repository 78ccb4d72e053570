// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media extraction engine.
//!
//! Given a validated URL and an exclusive work directory, produces locally
//! stored media files by trying an ordered cascade of strategies: extractor
//! binary invocations with cookie rotation and format negotiation, and an
//! HTML-scrape fallback as the last resort for gated image posts.
//!
//! Low-level strategy failures are caught and logged here; only the
//! exhaustion of all strategies propagates an error to the job layer.

pub mod binary;
pub mod cookies;
pub mod instagram;
pub mod process;
pub mod scrape;
pub mod strategy;
pub mod sweep;
pub mod tiktok;
pub mod workdir;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clipfetch_config::model::ExtractorConfig;
use clipfetch_core::{ClipfetchError, ExtractionResult, Platform, ValidatedUrl};
use tracing::info;

use crate::cookies::CookieSet;
use crate::strategy::{run_cascade, StrategyContext};

/// Browser-like user agent used for metadata probes and the scrape fallback.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// The extraction engine: immutable configuration resolved once at startup
/// and shared by reference across all job executions.
pub struct ExtractionEngine {
    binary: PathBuf,
    cookies: CookieSet,
    timeout: Duration,
    http: reqwest::Client,
}

impl ExtractionEngine {
    /// Builds an engine from configuration, resolving the extractor binary
    /// eagerly so a missing binary is reported at startup rather than on
    /// the first job.
    pub fn new(config: &ExtractorConfig) -> Result<Self, ClipfetchError> {
        let binary = binary::resolve_extractor(config.binary_path.as_deref())?;
        let cookies = CookieSet::from_paths(config.cookie_file_list());
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ClipfetchError::Internal(format!("http client build failed: {e}")))?;

        info!(binary = %binary.display(), cookies = cookies.configured_len(), "extraction engine ready");

        Ok(Self {
            binary,
            cookies,
            timeout: Duration::from_secs(config.timeout_secs),
            http,
        })
    }

    /// Extracts media for `url` into `work_dir`, trying the platform's
    /// strategy cascade until one succeeds.
    pub async fn extract(
        &self,
        url: &ValidatedUrl,
        work_dir: &Path,
    ) -> Result<ExtractionResult, ClipfetchError> {
        let ctx = StrategyContext {
            url,
            work_dir,
            binary: &self.binary,
            cookies: &self.cookies,
            timeout: self.timeout,
            http: &self.http,
        };

        let strategies = match url.platform() {
            Platform::TikTok => tiktok::strategies(),
            Platform::Instagram => instagram::strategies(&ctx).await,
        };

        run_cascade(&strategies, &ctx).await
    }
}
