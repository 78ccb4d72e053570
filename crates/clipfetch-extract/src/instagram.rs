// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instagram extraction.
//!
//! Instagram sits behind anti-scraping and login walls, so extraction is a
//! cascade: a media-type pre-detection step picks an image- or video-biased
//! strategy list, then each strategy is tried in order. Authenticated
//! attempts rotate through the configured cookie jars; anonymous attempts
//! rotate user agents and format selectors; the HTML scrape in
//! [`crate::scrape`] is the last resort for image posts.

use std::path::PathBuf;

use async_trait::async_trait;
use clipfetch_core::{ClipfetchError, MediaFile, MediaKind};
use tracing::{debug, warn};

use crate::scrape;
use crate::strategy::{
    collect_media_files, run_extractor_step, ExtractionStrategy, StrategyContext,
};
use crate::tiktok::build_common_args;

/// The expected extractor error when an image-only post is probed with a
/// video-biased selector. Not a real failure: a thumbnail may already have
/// been written before the extractor gave up on video formats.
const NO_VIDEO_FORMATS: &str = "no video formats";

/// User agents rotated by the anonymous retry strategy.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
];

/// Format selectors favoring large pixel dimensions, tried when the plain
/// "best" selector comes back empty.
const LARGE_DIMENSION_SELECTORS: &[&str] = &[
    "best[height>=1080]/best[width>=1080]/best",
    "best[height>=640]/best[width>=640]/best",
];

/// Best-effort classification of the target post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Image,
    Video,
    Unknown,
}

/// Classifies the post as image or video.
///
/// A metadata probe (`--dump-json --skip-download`) is authoritative when
/// it works; when it fails (common for gated posts), URL path conventions
/// decide: `/p/` is the single-image form, `/reel/`, `/reels/` and `/tv/`
/// are video forms.
pub async fn detect_post_kind(ctx: &StrategyContext<'_>) -> PostKind {
    let args: Vec<String> = [
        "--dump-json",
        "--skip-download",
        "--no-warnings",
        "--no-playlist",
        ctx.url.as_str(),
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    match run_extractor_step("instagram-probe", &args, ctx).await {
        Ok(output) => {
            // Playlist probes emit one JSON object per line; the first
            // entry decides.
            if let Some(line) = output.stdout.lines().find(|l| l.trim_start().starts_with('{'))
                && let Ok(meta) = serde_json::from_str::<serde_json::Value>(line)
            {
                if meta.get("is_video").and_then(|v| v.as_bool()) == Some(true) {
                    return PostKind::Video;
                }
                if let Some(ext) = meta.get("ext").and_then(|v| v.as_str()) {
                    let path = PathBuf::from(format!("probe.{ext}"));
                    match MediaKind::from_path(&path) {
                        Some(MediaKind::Video) => return PostKind::Video,
                        Some(MediaKind::Image) => return PostKind::Image,
                        None => {}
                    }
                }
            }
        }
        Err(e) => {
            debug!(error = %e, "metadata probe failed, falling back to path heuristics");
        }
    }

    let path = ctx.url.url().path();
    if path.starts_with("/p/") {
        PostKind::Image
    } else if path.starts_with("/reel/") || path.starts_with("/reels/") || path.starts_with("/tv/")
    {
        PostKind::Video
    } else {
        PostKind::Unknown
    }
}

/// Runs the extractor and tolerates the "no video formats" signature when
/// usable files (typically a pre-written thumbnail) are already on disk.
async fn run_salvaging_thumbnails(
    label: &str,
    args: &[String],
    ctx: &StrategyContext<'_>,
) -> Result<Vec<MediaFile>, ClipfetchError> {
    match run_extractor_step(label, args, ctx).await {
        Ok(_) => collect_media_files(ctx.work_dir),
        Err(e) => {
            if e.to_string().to_lowercase().contains(NO_VIDEO_FORMATS) {
                let files = collect_media_files(ctx.work_dir)?;
                if !files.is_empty() {
                    warn!(
                        strategy = label,
                        files = files.len(),
                        "extractor reported no video formats but wrote output, keeping it"
                    );
                    return Ok(files);
                }
            }
            Err(e)
        }
    }
}

/// Authenticated image attempt with one cookie jar: format probe with the
/// default selector, then an explicit thumbnail-write pass.
struct CookieImage {
    label: String,
    jar: PathBuf,
}

#[async_trait]
impl ExtractionStrategy for CookieImage {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let jar = self.jar.to_string_lossy().to_string();

        let mut args = vec![
            "--cookies".to_string(),
            jar.clone(),
            "-f".to_string(),
            "best".to_string(),
        ];
        args.extend(build_common_args(ctx.url.as_str()));
        if let Ok(files) = run_salvaging_thumbnails(self.label(), &args, ctx).await
            && !files.is_empty()
        {
            return Ok(files);
        }

        let mut args = vec![
            "--cookies".to_string(),
            jar,
            "--write-thumbnail".to_string(),
            "--skip-download".to_string(),
        ];
        args.extend(build_common_args(ctx.url.as_str()));
        run_extractor_step(self.label(), &args, ctx).await?;
        collect_media_files(ctx.work_dir)
    }
}

/// Anonymous thumbnail-only attempt.
struct ThumbnailOnly;

#[async_trait]
impl ExtractionStrategy for ThumbnailOnly {
    fn label(&self) -> &str {
        "instagram-image-thumbnail"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut args = vec!["--write-thumbnail".to_string(), "--skip-download".to_string()];
        args.extend(build_common_args(ctx.url.as_str()));
        run_extractor_step(self.label(), &args, ctx).await?;
        collect_media_files(ctx.work_dir)
    }
}

/// Anonymous attempt rotating browser user agents with the default
/// format selector.
struct RotatingUserAgent;

#[async_trait]
impl ExtractionStrategy for RotatingUserAgent {
    fn label(&self) -> &str {
        "instagram-image-user-agent"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut last_err = None;
        for agent in USER_AGENTS {
            let mut args = vec![
                "--user-agent".to_string(),
                (*agent).to_string(),
                "-f".to_string(),
                "best".to_string(),
            ];
            args.extend(build_common_args(ctx.url.as_str()));
            match run_salvaging_thumbnails(self.label(), &args, ctx).await {
                Ok(files) if !files.is_empty() => return Ok(files),
                Ok(_) => {}
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(vec![]),
        }
    }
}

/// Anonymous attempt with selectors biased toward large dimensions.
struct LargeDimensions;

#[async_trait]
impl ExtractionStrategy for LargeDimensions {
    fn label(&self) -> &str {
        "instagram-image-large"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut last_err = None;
        for selector in LARGE_DIMENSION_SELECTORS {
            let mut args = vec!["-f".to_string(), (*selector).to_string()];
            args.extend(build_common_args(ctx.url.as_str()));
            match run_salvaging_thumbnails(self.label(), &args, ctx).await {
                Ok(files) if !files.is_empty() => return Ok(files),
                Ok(_) => {}
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(vec![]),
        }
    }
}

/// Minimal-argument attempt: no format selector, let the extractor decide.
struct Minimal;

#[async_trait]
impl ExtractionStrategy for Minimal {
    fn label(&self) -> &str {
        "instagram-minimal"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let args = build_common_args(ctx.url.as_str());
        run_extractor_step(self.label(), &args, ctx).await?;
        collect_media_files(ctx.work_dir)
    }
}

/// Last resort for image posts: fetch and scan the post's HTML directly.
struct HtmlScrape;

#[async_trait]
impl ExtractionStrategy for HtmlScrape {
    fn label(&self) -> &str {
        "instagram-scrape"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        scrape::scrape_post_images(ctx).await
    }
}

/// Authenticated video attempt with one cookie jar.
struct CookieVideo {
    label: String,
    jar: PathBuf,
}

#[async_trait]
impl ExtractionStrategy for CookieVideo {
    fn label(&self) -> &str {
        &self.label
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut args = vec![
            "--cookies".to_string(),
            self.jar.to_string_lossy().to_string(),
            "-f".to_string(),
            "bv*+ba/b".to_string(),
        ];
        args.extend(build_common_args(ctx.url.as_str()));
        run_salvaging_thumbnails(self.label(), &args, ctx).await
    }
}

/// Anonymous video attempt, run after every credential has failed.
struct AnonymousVideo;

#[async_trait]
impl ExtractionStrategy for AnonymousVideo {
    fn label(&self) -> &str {
        "instagram-video-anonymous"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut args = vec!["-f".to_string(), "bv*+ba/b".to_string()];
        args.extend(build_common_args(ctx.url.as_str()));
        run_salvaging_thumbnails(self.label(), &args, ctx).await
    }
}

/// Combined attempt for posts whose type detection stayed inconclusive:
/// video-biased selector first, then the default one, keeping whatever
/// lands on disk.
struct Combined;

#[async_trait]
impl ExtractionStrategy for Combined {
    fn label(&self) -> &str {
        "instagram-combined"
    }

    async fn attempt(&self, ctx: &StrategyContext<'_>) -> Result<Vec<MediaFile>, ClipfetchError> {
        let mut video_args = vec!["-f".to_string(), "bv*+ba/b".to_string()];
        video_args.extend(build_common_args(ctx.url.as_str()));
        if let Ok(files) = run_salvaging_thumbnails(self.label(), &video_args, ctx).await
            && !files.is_empty()
        {
            return Ok(files);
        }

        let mut image_args = vec!["-f".to_string(), "best".to_string()];
        image_args.extend(build_common_args(ctx.url.as_str()));
        run_salvaging_thumbnails(self.label(), &image_args, ctx).await
    }
}

fn image_cascade(ctx: &StrategyContext<'_>) -> Vec<Box<dyn ExtractionStrategy>> {
    let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
    for (index, jar) in ctx.cookies.usable().into_iter().enumerate() {
        strategies.push(Box::new(CookieImage {
            label: format!("instagram-image-cookie-{}", index + 1),
            jar: jar.to_path_buf(),
        }));
    }
    strategies.push(Box::new(ThumbnailOnly));
    strategies.push(Box::new(RotatingUserAgent));
    strategies.push(Box::new(LargeDimensions));
    strategies.push(Box::new(Minimal));
    strategies.push(Box::new(HtmlScrape));
    strategies
}

fn video_cascade(ctx: &StrategyContext<'_>) -> Vec<Box<dyn ExtractionStrategy>> {
    let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();
    for (index, jar) in ctx.cookies.usable().into_iter().enumerate() {
        strategies.push(Box::new(CookieVideo {
            label: format!("instagram-video-cookie-{}", index + 1),
            jar: jar.to_path_buf(),
        }));
    }
    strategies.push(Box::new(AnonymousVideo));
    strategies
}

/// Builds the Instagram cascade for this URL. Runs type pre-detection,
/// which may invoke the extractor once for a metadata probe.
pub async fn strategies(ctx: &StrategyContext<'_>) -> Vec<Box<dyn ExtractionStrategy>> {
    let kind = detect_post_kind(ctx).await;
    debug!(url = %ctx.url, kind = ?kind, "instagram post type detected");
    match kind {
        PostKind::Image => image_cascade(ctx),
        PostKind::Video => video_cascade(ctx),
        PostKind::Unknown => {
            // Most posts on the platform are images; try that cascade
            // first, then one combined attempt covering both biases.
            let mut strategies = image_cascade(ctx);
            strategies.push(Box::new(Combined));
            strategies
        }
    }
}
