// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The download job state machine.
//!
//! One invocation owns one `DownloadRequest` end to end: create the work
//! directory, run the extraction cascade, classify and size-check the
//! results, deliver them, and remove the work directory on every exit path.
//! Failures are classified into retryable and terminal categories here; the
//! worker pool handles the actual re-enqueue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clipfetch_config::model::DownloadConfig;
use clipfetch_core::{
    classify_error, is_permission_error, ChatId, ClipfetchError, DeliveryClient, DownloadRequest,
    ErrorCategory, ExtractionResult, MediaFile, MediaKind, MessageId, Platform, ValidatedUrl,
};
use clipfetch_extract::workdir::WorkDir;
use clipfetch_extract::ExtractionEngine;
use tracing::{error, info, warn};

use crate::notices;

/// Telegram allows at most this many items in one media group.
const MEDIA_GROUP_LIMIT: usize = 10;

/// The extraction seam. The production implementation is
/// [`ExtractionEngine`]; tests substitute their own.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        url: &ValidatedUrl,
        work_dir: &Path,
    ) -> Result<ExtractionResult, ClipfetchError>;
}

#[async_trait]
impl Extractor for ExtractionEngine {
    async fn extract(
        &self,
        url: &ValidatedUrl,
        work_dir: &Path,
    ) -> Result<ExtractionResult, ClipfetchError> {
        ExtractionEngine::extract(self, url, work_dir).await
    }
}

/// Shared immutable dependencies of every job execution.
pub struct JobContext {
    pub delivery: Arc<dyn DeliveryClient>,
    pub extractor: Arc<dyn Extractor>,
    pub config: DownloadConfig,
}

/// Terminal state of one job attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// Media delivered (possibly partially, with oversized items skipped).
    Delivered,
    /// Retryable failure; re-enqueue after the given backoff.
    Retry(Duration),
    /// Permanently failed; the user has been notified.
    Failed,
}

/// Platform-specific backoff before retry `next_attempt` (1-based).
///
/// Instagram rate-limits aggressively on rapid retries, so its tiers grow;
/// TikTok failures are usually CDN transients that clear slower.
pub fn retry_delay(platform: Platform, next_attempt: u32) -> Duration {
    let tiers: &[u64] = match platform {
        Platform::Instagram => &[5, 10, 15],
        Platform::TikTok => &[10, 30],
    };
    let index = (next_attempt.saturating_sub(1) as usize).min(tiers.len() - 1);
    Duration::from_secs(tiers[index])
}

/// Runs one job attempt to a terminal state.
///
/// The work directory is removed before this returns, on every branch.
pub async fn run_job(ctx: &JobContext, request: &DownloadRequest) -> JobOutcome {
    info!(
        chat = request.chat.0,
        url = %request.url,
        attempt = request.attempt,
        "starting download job"
    );

    let work = match WorkDir::create(Path::new(&ctx.config.temp_root)).await {
        Ok(work) => work,
        Err(e) => {
            error!(error = %e, "cannot create work directory");
            let outcome = handle_failure(ctx, request, &e).await;
            finish(ctx, request, &outcome).await;
            return outcome;
        }
    };

    let outcome = match ctx.extractor.extract(&request.url, work.path()).await {
        Ok(result) => match deliver(ctx, request, result).await {
            Ok(()) => JobOutcome::Delivered,
            Err(e) => handle_failure(ctx, request, &e).await,
        },
        Err(e) => handle_failure(ctx, request, &e).await,
    };

    work.cleanup().await;
    finish(ctx, request, &outcome).await;
    outcome
}

/// Terminal-state housekeeping: the pre-sent "in progress" message is
/// deleted once the job will not run again.
async fn finish(ctx: &JobContext, request: &DownloadRequest, outcome: &JobOutcome) {
    if matches!(outcome, JobOutcome::Retry(_)) {
        return;
    }
    if let Some(progress) = request.progress_message_id
        && let Err(e) = ctx.delivery.delete_message(request.chat, progress).await
    {
        warn!(error = %e, "failed to delete progress message");
    }
}

/// Decides retry-vs-terminal and sends the single user-facing failure
/// notice on the terminal path.
async fn handle_failure(
    ctx: &JobContext,
    request: &DownloadRequest,
    err: &ClipfetchError,
) -> JobOutcome {
    let category = classify_error(err);
    let next_attempt = request.attempt + 1;

    if category.is_retryable() && next_attempt < ctx.config.max_attempts {
        let delay = retry_delay(request.url.platform(), next_attempt);
        warn!(
            error = %err,
            category = ?category,
            next_attempt,
            delay_secs = delay.as_secs(),
            "retryable failure, scheduling retry"
        );
        return JobOutcome::Retry(delay);
    }

    error!(
        error = %err,
        category = ?category,
        attempt = request.attempt,
        "job permanently failed"
    );
    let notice = if category == ErrorCategory::ContentUnavailable {
        notices::content_unavailable(&request.lang)
    } else {
        notices::download_failed(&request.lang)
    };
    if let Err(e) = ctx
        .delivery
        .send_text(request.chat, notice, Some(request.message_id))
        .await
    {
        warn!(error = %e, "failed to send failure notice");
    }
    JobOutcome::Failed
}

/// Splits extraction output into videos and images. Mixed output is
/// unexpected; the majority type wins (videos on a tie).
fn partition_majority(files: Vec<MediaFile>) -> (Vec<MediaFile>, Vec<MediaFile>) {
    let (videos, images): (Vec<MediaFile>, Vec<MediaFile>) = files
        .into_iter()
        .partition(|f| f.kind == MediaKind::Video);
    if !videos.is_empty() && !images.is_empty() {
        warn!(
            videos = videos.len(),
            images = images.len(),
            "extraction produced mixed media types, keeping the majority"
        );
        if videos.len() >= images.len() {
            return (videos, vec![]);
        }
        return (vec![], images);
    }
    (videos, images)
}

struct SizeChecked {
    videos: Vec<MediaFile>,
    images: Vec<MediaFile>,
    oversized_videos: usize,
}

/// Applies the platform upload caps. Oversized videos are counted so the
/// user gets an explicit "too large" notice; oversized images are quietly
/// dropped with a log line.
fn apply_size_caps(
    config: &DownloadConfig,
    videos: Vec<MediaFile>,
    images: Vec<MediaFile>,
) -> Result<SizeChecked, ClipfetchError> {
    let mut checked = SizeChecked {
        videos: Vec::new(),
        images: Vec::new(),
        oversized_videos: 0,
    };
    for file in videos {
        let size = std::fs::metadata(&file.path)?.len();
        if size > config.max_video_bytes {
            warn!(path = %file.path.display(), size, "video exceeds upload cap, skipping");
            checked.oversized_videos += 1;
        } else {
            checked.videos.push(file);
        }
    }
    for file in images {
        let size = std::fs::metadata(&file.path)?.len();
        if size > config.max_image_bytes {
            warn!(path = %file.path.display(), size, "image exceeds upload cap, skipping");
        } else {
            checked.images.push(file);
        }
    }
    Ok(checked)
}

/// Delivers extraction output to the requesting chat, handling the
/// group-permission fallback path.
async fn deliver(
    ctx: &JobContext,
    request: &DownloadRequest,
    result: ExtractionResult,
) -> Result<(), ClipfetchError> {
    info!(
        strategy = %result.strategy,
        files = result.files.len(),
        "extraction succeeded, delivering"
    );

    let (videos, images) = partition_majority(result.files);
    let checked = apply_size_caps(&ctx.config, videos, images)?;

    if checked.videos.is_empty() && checked.images.is_empty() {
        if checked.oversized_videos > 0 {
            // Explicit condition, not retried: the video exists but cannot
            // be uploaded.
            let _ = ctx
                .delivery
                .send_text(
                    request.chat,
                    notices::video_too_large(&request.lang),
                    Some(request.message_id),
                )
                .await;
            return Ok(());
        }
        return Err(ClipfetchError::Internal(
            "extraction result contained no deliverable files".into(),
        ));
    }

    let sent = send_all(
        ctx,
        request.chat,
        Some(request.message_id),
        &checked.videos,
        &checked.images,
    )
    .await;

    match sent {
        Ok(()) => {}
        Err(e) if is_permission_error(&e) => {
            if let Some(user) = request.fallback_user {
                warn!(chat = request.chat.0, user = user.0, "group delivery blocked, falling back to private chat");
                // Reply anchors are meaningless in the other chat.
                send_all(ctx, user, None, &checked.videos, &checked.images).await?;
                let _ = ctx
                    .delivery
                    .send_text(
                        request.chat,
                        notices::redirected_to_private(&request.lang),
                        Some(request.message_id),
                    )
                    .await;
            } else {
                let _ = ctx
                    .delivery
                    .send_text(
                        request.chat,
                        notices::permission_denied(&request.lang),
                        Some(request.message_id),
                    )
                    .await;
            }
        }
        Err(e) => return Err(e),
    }

    if checked.oversized_videos > 0 {
        let _ = ctx
            .delivery
            .send_text(
                request.chat,
                notices::video_too_large(&request.lang),
                Some(request.message_id),
            )
            .await;
    }

    Ok(())
}

/// Sends all media to one chat. Multi-image results go out as one grouped
/// message; a rejected group falls back to per-item delivery.
async fn send_all(
    ctx: &JobContext,
    chat: ChatId,
    reply_to: Option<MessageId>,
    videos: &[MediaFile],
    images: &[MediaFile],
) -> Result<(), ClipfetchError> {
    for video in videos {
        let ok = ctx
            .delivery
            .send_video(chat, &video.path, None, reply_to)
            .await?;
        if !ok {
            return Err(ClipfetchError::Delivery {
                message: format!("video send rejected for {}", video.path.display()),
                source: None,
            });
        }
    }

    if images.len() == 1 {
        return send_single_photo(ctx, chat, &images[0], reply_to).await;
    }
    if images.is_empty() {
        return Ok(());
    }

    let group_len = images.len().min(MEDIA_GROUP_LIMIT);
    let (group, excess) = images.split_at(group_len);
    let paths: Vec<PathBuf> = group.iter().map(|f| f.path.clone()).collect();

    let group_delivered = match ctx.delivery.send_media_group(chat, &paths, None).await {
        Ok(delivered) => delivered,
        Err(e) if is_permission_error(&e) => return Err(e),
        Err(e) => {
            warn!(error = %e, "media group send failed, falling back to per-item delivery");
            false
        }
    };
    if !group_delivered {
        for image in group {
            send_single_photo(ctx, chat, image, reply_to).await?;
        }
    }

    for image in excess {
        send_single_photo(ctx, chat, image, reply_to).await?;
    }
    Ok(())
}

async fn send_single_photo(
    ctx: &JobContext,
    chat: ChatId,
    image: &MediaFile,
    reply_to: Option<MessageId>,
) -> Result<(), ClipfetchError> {
    let ok = ctx
        .delivery
        .send_photo(chat, &image.path, None, reply_to)
        .await?;
    if !ok {
        return Err(ClipfetchError::Delivery {
            message: format!("photo send rejected for {}", image.path.display()),
            source: None,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipfetch_test_utils::{MockDelivery, SentItem};

    /// Test extractor: writes the scripted files into the work directory,
    /// or fails with the scripted error.
    struct ScriptedExtractor {
        files: Vec<(String, usize)>,
        error: Option<fn() -> ClipfetchError>,
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn extract(
            &self,
            _url: &ValidatedUrl,
            work_dir: &Path,
        ) -> Result<ExtractionResult, ClipfetchError> {
            if let Some(make_err) = self.error {
                return Err(make_err());
            }
            let mut files = Vec::new();
            for (name, size) in &self.files {
                let path = work_dir.join(name);
                std::fs::write(&path, vec![0u8; *size]).unwrap();
                files.push(MediaFile::classify(path).unwrap());
            }
            Ok(ExtractionResult {
                files,
                strategy: "scripted".into(),
            })
        }
    }

    fn context(
        delivery: Arc<MockDelivery>,
        extractor: ScriptedExtractor,
        temp_root: &Path,
    ) -> JobContext {
        JobContext {
            delivery,
            extractor: Arc::new(extractor),
            config: DownloadConfig {
                temp_root: temp_root.to_string_lossy().into(),
                max_video_bytes: 1000,
                max_image_bytes: 500,
                ..Default::default()
            },
        }
    }

    fn request(url: &str) -> DownloadRequest {
        DownloadRequest {
            chat: ChatId(-100),
            url: clipfetch_core::validate(url).unwrap(),
            message_id: MessageId(7),
            lang: "en".into(),
            progress_message_id: Some(MessageId(8)),
            fallback_user: None,
            attempt: 0,
        }
    }

    fn exhausted() -> ClipfetchError {
        ClipfetchError::StrategiesExhausted {
            url: "https://www.tiktok.com/@u/video/1".into(),
        }
    }

    fn private_post() -> ClipfetchError {
        ClipfetchError::Strategy {
            strategy: "x".into(),
            message: "ERROR: This account is private".into(),
        }
    }

    fn network_flake() -> ClipfetchError {
        ClipfetchError::Strategy {
            strategy: "x".into(),
            message: "connection reset by peer".into(),
        }
    }

    #[tokio::test]
    async fn successful_video_job_delivers_and_deletes_progress() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![("clip.mp4".into(), 100)],
                error: None,
            },
            root.path(),
        );
        let req = request("https://www.tiktok.com/@u/video/1");

        let outcome = run_job(&ctx, &req).await;
        assert_eq!(outcome, JobOutcome::Delivered);

        let sent = delivery.sent().await;
        assert!(matches!(&sent[0], SentItem::Video { chat, reply_to, .. }
            if chat.0 == -100 && *reply_to == Some(MessageId(7))));
        assert!(matches!(&sent[1], SentItem::Delete { message_id, .. }
            if *message_id == MessageId(8)));
        // Work directory must be gone.
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn multi_image_result_goes_out_as_one_group() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let files = (0..3).map(|i| (format!("{i}.jpg"), 100)).collect();
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor { files, error: None },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let sent = delivery.sent().await;
        assert!(matches!(&sent[0], SentItem::MediaGroup { paths, .. } if paths.len() == 3));
    }

    #[tokio::test]
    async fn oversized_group_splits_excess_into_individual_sends() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let files = (0..12).map(|i| (format!("{i:02}.jpg"), 100)).collect();
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor { files, error: None },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let sent = delivery.sent().await;
        let groups = sent
            .iter()
            .filter(|s| matches!(s, SentItem::MediaGroup { .. }))
            .count();
        let singles = sent
            .iter()
            .filter(|s| matches!(s, SentItem::Photo { .. }))
            .count();
        assert_eq!(groups, 1);
        assert_eq!(singles, 2);
    }

    #[tokio::test]
    async fn rejected_group_falls_back_to_per_item_delivery() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        delivery.reject_media_groups();
        let files = (0..3).map(|i| (format!("{i}.jpg"), 100)).collect();
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor { files, error: None },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let sent = delivery.sent().await;
        let singles = sent
            .iter()
            .filter(|s| matches!(s, SentItem::Photo { .. }))
            .count();
        assert_eq!(singles, 3);
    }

    #[tokio::test]
    async fn permission_error_with_fallback_user_redirects() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        delivery.deny_chat(ChatId(-100)).await;
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![("clip.mp4".into(), 100)],
                error: None,
            },
            root.path(),
        );
        let mut req = request("https://www.tiktok.com/@u/video/1");
        req.fallback_user = Some(ChatId(555));

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let sent = delivery.sent().await;
        // Video lands in the private chat without a reply anchor.
        assert!(sent.iter().any(|s| matches!(s, SentItem::Video { chat, reply_to, .. }
            if chat.0 == 555 && reply_to.is_none())));
        // Original chat is told about the redirect.
        let texts = delivery.texts_to(ChatId(-100)).await;
        assert!(texts.iter().any(|t| t.contains("privately")));
    }

    #[tokio::test]
    async fn permission_error_without_fallback_reports_to_chat() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        delivery.deny_chat(ChatId(-100)).await;
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![("clip.mp4".into(), 100)],
                error: None,
            },
            root.path(),
        );
        let req = request("https://www.tiktok.com/@u/video/1");

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let texts = delivery.texts_to(ChatId(-100)).await;
        assert!(texts.iter().any(|t| t.contains("permission")));
    }

    #[tokio::test]
    async fn oversized_video_is_reported_not_retried() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![("big.mp4".into(), 5000)],
                error: None,
            },
            root.path(),
        );
        let req = request("https://www.tiktok.com/@u/video/1");

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let sent = delivery.sent().await;
        assert!(!sent.iter().any(|s| matches!(s, SentItem::Video { .. })));
        let texts = delivery.texts_to(ChatId(-100)).await;
        assert!(texts.iter().any(|t| t.contains("too large")));
    }

    #[tokio::test]
    async fn mixed_output_keeps_the_majority_type() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![
                    ("a.jpg".into(), 100),
                    ("b.jpg".into(), 100),
                    ("thumb.mp4".into(), 100),
                ],
                error: None,
            },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Delivered);
        let sent = delivery.sent().await;
        assert!(!sent.iter().any(|s| matches!(s, SentItem::Video { .. })));
        assert!(sent.iter().any(|s| matches!(s, SentItem::MediaGroup { paths, .. } if paths.len() == 2)));
    }

    #[tokio::test]
    async fn retryable_failure_schedules_backoff() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![],
                error: Some(network_flake),
            },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");

        let outcome = run_job(&ctx, &req).await;
        assert_eq!(outcome, JobOutcome::Retry(Duration::from_secs(5)));
        // No user notice and no progress deletion while retries remain.
        assert_eq!(delivery.sent_count().await, 0);
    }

    #[tokio::test]
    async fn exhausted_attempts_fail_with_a_single_notice() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![],
                error: Some(network_flake),
            },
            root.path(),
        );
        let mut req = request("https://www.instagram.com/p/ABC/");
        req.attempt = 2; // max_attempts defaults to 3

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Failed);
        let texts = delivery.texts_to(ChatId(-100)).await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("Could not download"));
    }

    #[tokio::test]
    async fn private_content_fails_immediately() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![],
                error: Some(private_post),
            },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");

        // First attempt, but the category is terminal.
        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Failed);
        let texts = delivery.texts_to(ChatId(-100)).await;
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("unavailable"));
    }

    #[tokio::test]
    async fn strategies_exhausted_is_terminal_after_max_attempts() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![],
                error: Some(exhausted),
            },
            root.path(),
        );
        let mut req = request("https://www.tiktok.com/@u/video/1");
        req.attempt = 2;

        assert_eq!(run_job(&ctx, &req).await, JobOutcome::Failed);
    }

    #[tokio::test]
    async fn work_directory_is_removed_on_failure_paths() {
        let root = tempfile::tempdir().unwrap();
        let delivery = Arc::new(MockDelivery::new());
        let ctx = context(
            delivery.clone(),
            ScriptedExtractor {
                files: vec![],
                error: Some(private_post),
            },
            root.path(),
        );
        let req = request("https://www.instagram.com/p/ABC/");
        run_job(&ctx, &req).await;
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn retry_tiers_follow_platform_and_attempt() {
        assert_eq!(retry_delay(Platform::Instagram, 1), Duration::from_secs(5));
        assert_eq!(retry_delay(Platform::Instagram, 2), Duration::from_secs(10));
        assert_eq!(retry_delay(Platform::Instagram, 3), Duration::from_secs(15));
        assert_eq!(retry_delay(Platform::Instagram, 9), Duration::from_secs(15));
        assert_eq!(retry_delay(Platform::TikTok, 1), Duration::from_secs(10));
        assert_eq!(retry_delay(Platform::TikTok, 2), Duration::from_secs(30));
    }
}
