// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TikTok extraction.
//!
//! TikTok videos come down reliably with a single anonymous extractor
//! invocation, so the cascade has one strategy. Short-link hosts
//! (vm/vt.tiktok.com) are resolved by the extractor itself.

use async_trait::async_trait;
use clipfetch_core::{ClipfetchError, MediaFile};

use crate::strategy::{collect_media_files, run_extractor_step, ExtractionStrategy, StrategyContext};

/// Output template used by all extractor invocations. Relative to the work
/// directory, title truncated so filesystem limits are never hit.
pub(crate) const OUTPUT_TEMPLATE: &str = "%(title).80s.%(ext)s";

/// Arguments common to every extractor invocation.
pub(crate) fn build_common_args(url: &str) -> Vec<String> {
    [
        "--no-playlist",
        "--no-warnings",
        "--no-progress",
        "--restrict-filenames",
        "-o",
        OUTPUT_TEMPLATE,
        url,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub struct TikTokVideo;

#[async_trait]
impl ExtractionStrategy for TikTokVideo {
    fn label(&self) -> &str {
        "tiktok-video"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut args = vec!["-f".to_string(), "b".to_string()];
        args.extend(build_common_args(ctx.url.as_str()));
        run_extractor_step(self.label(), &args, ctx).await?;
        collect_media_files(ctx.work_dir)
    }
}

/// The TikTok cascade: one anonymous video download.
pub fn strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![Box::new(TikTokVideo)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_args_end_with_url() {
        let args = build_common_args("https://www.tiktok.com/@u/video/1");
        assert_eq!(args.last().unwrap(), "https://www.tiktok.com/@u/video/1");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&OUTPUT_TEMPLATE.to_string()));
    }

    #[test]
    fn cascade_has_one_strategy() {
        let strategies = strategies();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].label(), "tiktok-video");
    }
}
