// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram integration for clipfetch.
//!
//! Implements the [`DeliveryClient`] boundary over the Telegram Bot API via
//! teloxide, and routes inbound long-polling messages into the download
//! queue.

pub mod inbound;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clipfetch_config::model::TelegramConfig;
use clipfetch_core::{ChatId, ClipfetchError, DeliveryClient, MessageId};
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaPhoto, ReplyParameters};
use tracing::debug;

/// Telegram implementation of the delivery boundary.
pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    /// Requires `config.bot_token` to be set and non-empty.
    pub fn new(config: &TelegramConfig) -> Result<Self, ClipfetchError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            ClipfetchError::Config("telegram.bot_token is required to serve".into())
        })?;
        if token.is_empty() {
            return Err(ClipfetchError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    /// The underlying teloxide bot, for the long-polling dispatcher.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn chat(chat: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat.0)
}

fn reply(reply_to: Option<MessageId>) -> Option<ReplyParameters> {
    reply_to.map(|id| ReplyParameters::new(teloxide::types::MessageId(id.0)))
}

fn send_error(action: &str, e: teloxide::RequestError) -> ClipfetchError {
    ClipfetchError::Delivery {
        message: format!("{action} failed: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl DeliveryClient for TelegramDelivery {
    async fn send_text(
        &self,
        to: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, ClipfetchError> {
        let mut request = self.bot.send_message(chat(to), text);
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        let sent = request.await.map_err(|e| send_error("send_message", e))?;
        Ok(MessageId(sent.id.0))
    }

    async fn send_photo(
        &self,
        to: ChatId,
        path: &Path,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> Result<bool, ClipfetchError> {
        let mut request = self.bot.send_photo(chat(to), InputFile::file(path));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        request.await.map_err(|e| send_error("send_photo", e))?;
        Ok(true)
    }

    async fn send_video(
        &self,
        to: ChatId,
        path: &Path,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> Result<bool, ClipfetchError> {
        let mut request = self.bot.send_video(chat(to), InputFile::file(path));
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        if let Some(params) = reply(reply_to) {
            request = request.reply_parameters(params);
        }
        request.await.map_err(|e| send_error("send_video", e))?;
        Ok(true)
    }

    async fn send_media_group(
        &self,
        to: ChatId,
        paths: &[PathBuf],
        caption: Option<&str>,
    ) -> Result<bool, ClipfetchError> {
        let media: Vec<InputMedia> = paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                let mut photo = InputMediaPhoto::new(InputFile::file(path.clone()));
                // Telegram shows the caption of the first item for the
                // whole album.
                if index == 0
                    && let Some(caption) = caption
                {
                    photo = photo.caption(caption);
                }
                InputMedia::Photo(photo)
            })
            .collect();
        self.bot
            .send_media_group(chat(to), media)
            .await
            .map_err(|e| send_error("send_media_group", e))?;
        Ok(true)
    }

    async fn delete_message(
        &self,
        to: ChatId,
        message_id: MessageId,
    ) -> Result<bool, ClipfetchError> {
        match self
            .bot
            .delete_message(chat(to), teloxide::types::MessageId(message_id.0))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string().to_lowercase();
                // Already gone or too old: a refusal, not an error.
                if message.contains("message to delete not found")
                    || message.contains("message can't be deleted")
                {
                    debug!(message_id = message_id.0, "delete refused by telegram");
                    return Ok(false);
                }
                Err(send_error("delete_message", e))
            }
        }
    }
}
