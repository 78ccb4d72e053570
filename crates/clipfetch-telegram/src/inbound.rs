// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message routing.
//!
//! Long-polled messages are classified into one of three actions: ignore,
//! reply with an invalid-link notice (private chats only, so groups are
//! never spammed), or dispatch a download job. Platform redeliveries are
//! suppressed by the update-id marker; duplicate processing of one user
//! action is suppressed by the chat+message+URL marker.

use std::sync::Arc;

use clipfetch_core::{find_link, ChatId, DownloadRequest, MessageId};
use clipfetch_dedup::{keys, DedupStore, DISPATCH_TTL, LANGUAGE_TTL, UPDATE_TTL};
use clipfetch_job::notices;
use clipfetch_job::worker::JobQueue;
use teloxide::prelude::*;
use teloxide::types::Message;
use tracing::{debug, info, warn};

use crate::TelegramDelivery;
use clipfetch_core::DeliveryClient;

/// Shared dependencies of the inbound handler.
pub struct InboundDeps {
    pub store: Arc<DedupStore>,
    pub queue: JobQueue,
    pub delivery: Arc<TelegramDelivery>,
}

/// What to do with one inbound message.
#[derive(Debug)]
pub enum InboundAction {
    Ignore,
    /// Reply that the link is unsupported.
    InvalidLink { lang: String },
    Dispatch(DownloadRequest),
}

/// Default language when the sender never exposed one.
const DEFAULT_LANG: &str = "en";

/// Classifies an inbound message. Pure with respect to Telegram: all side
/// effects are on the dedup store.
pub fn classify_inbound(store: &DedupStore, update_id: i64, msg: &Message) -> InboundAction {
    if !store.check_and_mark(&keys::update_key(update_id), UPDATE_TTL) {
        debug!(update_id, "duplicate update delivery, ignoring");
        return InboundAction::Ignore;
    }

    let Some(text) = msg.text() else {
        return InboundAction::Ignore;
    };

    let lang = resolve_lang(store, msg);

    let Some(url) = find_link(text) else {
        // Groups see all traffic; only private chats get the notice.
        if msg.chat.is_private() {
            return InboundAction::InvalidLink { lang };
        }
        return InboundAction::Ignore;
    };

    let dispatch = keys::dispatch_key(msg.chat.id.0, msg.id.0, url.as_str());
    if !store.check_and_mark(&dispatch, DISPATCH_TTL) {
        debug!(chat = msg.chat.id.0, message = msg.id.0, "duplicate dispatch, ignoring");
        return InboundAction::Ignore;
    }

    let fallback_user = if msg.chat.is_private() {
        None
    } else {
        msg.from.as_ref().map(|user| ChatId(user.id.0 as i64))
    };

    InboundAction::Dispatch(DownloadRequest {
        chat: ChatId(msg.chat.id.0),
        url,
        message_id: MessageId(msg.id.0),
        lang,
        progress_message_id: None,
        fallback_user,
        attempt: 0,
    })
}

/// Sender language: the message's own code when present (and cached for
/// 30 days), otherwise the cached preference, otherwise English.
fn resolve_lang(store: &DedupStore, msg: &Message) -> String {
    let Some(user) = msg.from.as_ref() else {
        return DEFAULT_LANG.to_string();
    };
    let key = keys::language_key(user.id.0 as i64);
    if let Some(code) = user.language_code.as_deref() {
        store.put_cached(&key, code, LANGUAGE_TTL);
        return code.to_string();
    }
    store.get_cached(&key).unwrap_or_else(|| DEFAULT_LANG.to_string())
}

/// Handles one classified message: sends the progress reply and enqueues
/// the request.
pub async fn handle_message(deps: &InboundDeps, update_id: i64, msg: &Message) {
    match classify_inbound(&deps.store, update_id, msg) {
        InboundAction::Ignore => {}
        InboundAction::InvalidLink { lang } => {
            if let Err(e) = deps
                .delivery
                .send_text(
                    ChatId(msg.chat.id.0),
                    notices::invalid_link(&lang),
                    Some(MessageId(msg.id.0)),
                )
                .await
            {
                warn!(error = %e, "failed to send invalid-link notice");
            }
        }
        InboundAction::Dispatch(mut request) => {
            info!(chat = request.chat.0, url = %request.url, "dispatching download");
            match deps
                .delivery
                .send_text(
                    request.chat,
                    notices::in_progress(&request.lang),
                    Some(request.message_id),
                )
                .await
            {
                Ok(id) => request.progress_message_id = Some(id),
                Err(e) => warn!(error = %e, "failed to send progress notice"),
            }

            let progress = request.progress_message_id;
            let chat = request.chat;
            let lang = request.lang.clone();
            let reply_to = request.message_id;
            if !deps.queue.enqueue(request).await {
                if let Err(e) = deps
                    .delivery
                    .send_text(chat, notices::download_failed(&lang), Some(reply_to))
                    .await
                {
                    warn!(error = %e, "failed to send queue-full notice");
                }
                if let Some(progress) = progress
                    && let Err(e) = deps.delivery.delete_message(chat, progress).await
                {
                    warn!(error = %e, "failed to delete progress message");
                }
            }
        }
    }
}

/// Spawns the long-polling dispatcher. Runs until aborted at shutdown.
pub fn spawn_dispatcher(bot: Bot, deps: Arc<InboundDeps>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting telegram long polling");
        let handler = Update::filter_message().endpoint(move |update: Update, msg: Message| {
            let deps = deps.clone();
            async move {
                handle_message(&deps, i64::from(update.id.0), &msg).await;
                respond(())
            }
        });

        Dispatcher::builder(bot, handler)
            .default_handler(|_| async {}) // ignore non-message updates
            .build()
            .dispatch()
            .await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock message from JSON, matching the Telegram Bot API shape.
    fn make_message(chat_id: i64, chat_type: &str, message_id: i32, text: &str) -> Message {
        let chat = if chat_type == "private" {
            serde_json::json!({ "id": chat_id, "type": "private", "first_name": "Test" })
        } else {
            serde_json::json!({ "id": chat_id, "type": chat_type, "title": "Test Group" })
        };
        let json = serde_json::json!({
            "message_id": message_id,
            "date": 1700000000i64,
            "chat": chat,
            "from": {
                "id": 42,
                "is_bot": false,
                "first_name": "Test",
                "language_code": "ru",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    #[test]
    fn valid_link_dispatches_with_language() {
        let store = DedupStore::new();
        let msg = make_message(100, "private", 1, "https://www.tiktok.com/@u/video/1");
        match classify_inbound(&store, 1, &msg) {
            InboundAction::Dispatch(request) => {
                assert_eq!(request.chat, ChatId(100));
                assert_eq!(request.message_id, MessageId(1));
                assert_eq!(request.lang, "ru");
                assert_eq!(request.attempt, 0);
                assert!(request.fallback_user.is_none());
            }
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn group_message_carries_fallback_user() {
        let store = DedupStore::new();
        let msg = make_message(-100200, "supergroup", 1, "https://www.instagram.com/p/A/");
        match classify_inbound(&store, 1, &msg) {
            InboundAction::Dispatch(request) => {
                assert_eq!(request.chat, ChatId(-100200));
                assert_eq!(request.fallback_user, Some(ChatId(42)));
            }
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_update_is_ignored() {
        let store = DedupStore::new();
        let msg = make_message(100, "private", 1, "https://www.tiktok.com/@u/video/1");
        assert!(matches!(
            classify_inbound(&store, 7, &msg),
            InboundAction::Dispatch(_)
        ));
        assert!(matches!(
            classify_inbound(&store, 7, &msg),
            InboundAction::Ignore
        ));
    }

    #[test]
    fn duplicate_dispatch_is_ignored_across_updates() {
        let store = DedupStore::new();
        let msg = make_message(100, "private", 1, "https://www.tiktok.com/@u/video/1");
        assert!(matches!(
            classify_inbound(&store, 1, &msg),
            InboundAction::Dispatch(_)
        ));
        // Same message re-delivered under a fresh update id.
        assert!(matches!(
            classify_inbound(&store, 2, &msg),
            InboundAction::Ignore
        ));
    }

    #[test]
    fn link_in_surrounding_text_is_found() {
        let store = DedupStore::new();
        let msg = make_message(
            100,
            "private",
            1,
            "look at this https://www.instagram.com/reel/XYZ/ amazing",
        );
        assert!(matches!(
            classify_inbound(&store, 1, &msg),
            InboundAction::Dispatch(_)
        ));
    }

    #[test]
    fn non_link_text_in_private_chat_gets_a_notice() {
        let store = DedupStore::new();
        let msg = make_message(100, "private", 1, "hello there");
        assert!(matches!(
            classify_inbound(&store, 1, &msg),
            InboundAction::InvalidLink { .. }
        ));
    }

    #[test]
    fn non_link_text_in_group_is_silently_ignored() {
        let store = DedupStore::new();
        let msg = make_message(-100200, "supergroup", 1, "hello everyone");
        assert!(matches!(
            classify_inbound(&store, 1, &msg),
            InboundAction::Ignore
        ));
    }

    #[test]
    fn language_is_cached_for_later_messages() {
        let store = DedupStore::new();
        let msg = make_message(100, "private", 1, "https://www.tiktok.com/@u/video/1");
        let _ = classify_inbound(&store, 1, &msg);
        assert_eq!(
            store.get_cached(&keys::language_key(42)).as_deref(),
            Some("ru")
        );
    }
}
