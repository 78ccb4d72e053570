// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the clipfetch workspace.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::validate::ValidatedUrl;

/// Telegram chat identifier (negative for groups/supergroups).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Telegram message identifier, unique within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i32);

/// Supported source platforms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Instagram,
    TikTok,
}

/// Classification of an extracted file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    Video,
    Image,
}

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv", "m4v"];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic"];

impl MediaKind {
    /// Classifies a file path by extension. Returns `None` for anything
    /// that is neither a known video nor a known image extension
    /// (subtitles, json sidecars, partial downloads).
    pub fn from_path(path: &Path) -> Option<MediaKind> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }
}

/// One locally stored media file produced by extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaFile {
    /// Builds a `MediaFile` if the path has a recognized media extension.
    pub fn classify(path: PathBuf) -> Option<MediaFile> {
        let kind = MediaKind::from_path(&path)?;
        Some(MediaFile { path, kind })
    }
}

/// The output of a successful extraction: files plus the label of the
/// strategy that produced them.
///
/// Owned exclusively by the job invocation that requested it; the files and
/// their containing work directory must be removed before the job finishes,
/// on every exit path.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub files: Vec<MediaFile>,
    pub strategy: String,
}

/// One unit of download work, created on receipt of a qualifying message.
///
/// Immutable except for `attempt`, which the retry mechanism increments on
/// each re-enqueue.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub chat: ChatId,
    pub url: ValidatedUrl,
    /// The message that contained the link; replies are anchored to it.
    pub message_id: MessageId,
    /// BCP-47 language preference for user-facing notices.
    pub lang: String,
    /// A pre-sent "working on it" message to delete after delivery.
    pub progress_message_id: Option<MessageId>,
    /// Private-chat identity to fall back to when group delivery is
    /// blocked by bot permissions.
    pub fallback_user: Option<ChatId>,
    pub attempt: u32,
}

impl DownloadRequest {
    /// Returns a copy with the attempt counter incremented, for re-enqueue.
    pub fn next_attempt(&self) -> DownloadRequest {
        DownloadRequest {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }
}
