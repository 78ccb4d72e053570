// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The delivery boundary: the messaging platform as an external collaborator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::ClipfetchError;
use crate::types::{ChatId, MessageId};

/// Abstraction over the messaging platform's send/delete operations.
///
/// Implementations may fail either with an error (network, remote rejection)
/// or by returning `false`; callers must treat both as first-class failure
/// outcomes rather than assuming errors carry every failure mode.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Sends a text message, optionally as a reply. Returns the new
    /// message's identifier.
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, ClipfetchError>;

    /// Sends a photo from a local file.
    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> Result<bool, ClipfetchError>;

    /// Sends a video from a local file.
    async fn send_video(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> Result<bool, ClipfetchError>;

    /// Sends up to 10 photos as a single grouped message.
    async fn send_media_group(
        &self,
        chat: ChatId,
        paths: &[PathBuf],
        caption: Option<&str>,
    ) -> Result<bool, ClipfetchError>;

    /// Deletes a previously sent message. Best-effort; `false` means the
    /// platform refused (already deleted, too old, missing rights).
    async fn delete_message(&self, chat: ChatId, message_id: MessageId)
        -> Result<bool, ClipfetchError>;
}
