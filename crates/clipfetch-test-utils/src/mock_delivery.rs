// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery client for deterministic testing.
//!
//! `MockDelivery` implements `DeliveryClient` with captured outbound calls
//! for assertion in tests, plus scriptable failure modes: rejected media
//! groups (the `false` return path) and permission-denied chats (the error
//! path that routes jobs to their private-chat fallback).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use clipfetch_core::{ChatId, ClipfetchError, DeliveryClient, MessageId};

/// One captured outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentItem {
    Text {
        chat: ChatId,
        text: String,
        reply_to: Option<MessageId>,
    },
    Photo {
        chat: ChatId,
        path: PathBuf,
        caption: Option<String>,
        reply_to: Option<MessageId>,
    },
    Video {
        chat: ChatId,
        path: PathBuf,
        caption: Option<String>,
        reply_to: Option<MessageId>,
    },
    MediaGroup {
        chat: ChatId,
        paths: Vec<PathBuf>,
        caption: Option<String>,
    },
    Delete {
        chat: ChatId,
        message_id: MessageId,
    },
}

/// A mock delivery client capturing every call.
#[derive(Default)]
pub struct MockDelivery {
    sent: Arc<Mutex<Vec<SentItem>>>,
    denied_chats: Arc<Mutex<HashSet<i64>>>,
    reject_media_groups: AtomicBool,
    next_message_id: AtomicI32,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every media send to `chat` will fail with a permission error.
    pub async fn deny_chat(&self, chat: ChatId) {
        self.denied_chats.lock().await.insert(chat.0);
    }

    /// `send_media_group` will return `Ok(false)` instead of succeeding.
    pub fn reject_media_groups(&self) {
        self.reject_media_groups.store(true, Ordering::SeqCst);
    }

    /// All captured calls, in order.
    pub async fn sent(&self) -> Vec<SentItem> {
        self.sent.lock().await.clone()
    }

    /// Captured text messages to `chat`, in order.
    pub async fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|item| match item {
                SentItem::Text { chat: c, text, .. } if *c == chat => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    async fn capture(&self, item: SentItem) {
        self.sent.lock().await.push(item);
    }

    async fn is_denied(&self, chat: ChatId) -> bool {
        self.denied_chats.lock().await.contains(&chat.0)
    }

    fn permission_error() -> ClipfetchError {
        ClipfetchError::Delivery {
            message: "Bad Request: not enough rights to send photos to the chat".into(),
            source: None,
        }
    }
}

#[async_trait]
impl DeliveryClient for MockDelivery {
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, ClipfetchError> {
        self.capture(SentItem::Text {
            chat,
            text: text.to_string(),
            reply_to,
        })
        .await;
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1000;
        Ok(MessageId(id))
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> Result<bool, ClipfetchError> {
        if self.is_denied(chat).await {
            return Err(Self::permission_error());
        }
        self.capture(SentItem::Photo {
            chat,
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
            reply_to,
        })
        .await;
        Ok(true)
    }

    async fn send_video(
        &self,
        chat: ChatId,
        path: &Path,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> Result<bool, ClipfetchError> {
        if self.is_denied(chat).await {
            return Err(Self::permission_error());
        }
        self.capture(SentItem::Video {
            chat,
            path: path.to_path_buf(),
            caption: caption.map(str::to_string),
            reply_to,
        })
        .await;
        Ok(true)
    }

    async fn send_media_group(
        &self,
        chat: ChatId,
        paths: &[PathBuf],
        caption: Option<&str>,
    ) -> Result<bool, ClipfetchError> {
        if self.is_denied(chat).await {
            return Err(Self::permission_error());
        }
        if self.reject_media_groups.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.capture(SentItem::MediaGroup {
            chat,
            paths: paths.to_vec(),
            caption: caption.map(str::to_string),
        })
        .await;
        Ok(true)
    }

    async fn delete_message(
        &self,
        chat: ChatId,
        message_id: MessageId,
    ) -> Result<bool, ClipfetchError> {
        self.capture(SentItem::Delete { chat, message_id }).await;
        Ok(true)
    }
}
