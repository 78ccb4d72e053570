// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notice text.
//!
//! Two languages only: Russian for `ru`-prefixed language codes, English
//! for everything else. Notices are deliberately generic; extraction
//! internals never leak into chat.

fn is_russian(lang: &str) -> bool {
    lang == "ru" || lang.starts_with("ru-")
}

pub fn in_progress(lang: &str) -> &'static str {
    if is_russian(lang) {
        "Скачиваю, секунду..."
    } else {
        "Downloading, one moment..."
    }
}

pub fn invalid_link(lang: &str) -> &'static str {
    if is_russian(lang) {
        "Эта ссылка не поддерживается. Пришлите ссылку на Instagram или TikTok."
    } else {
        "That link is not supported. Send an Instagram or TikTok link."
    }
}

pub fn download_failed(lang: &str) -> &'static str {
    if is_russian(lang) {
        "Не получилось скачать. Попробуйте позже."
    } else {
        "Could not download that. Please try again later."
    }
}

pub fn content_unavailable(lang: &str) -> &'static str {
    if is_russian(lang) {
        "Контент недоступен: пост приватный или удалён."
    } else {
        "That content is unavailable: the post is private or has been removed."
    }
}

pub fn video_too_large(lang: &str) -> &'static str {
    if is_russian(lang) {
        "Видео слишком большое для отправки."
    } else {
        "The video is too large to send."
    }
}

pub fn redirected_to_private(lang: &str) -> &'static str {
    if is_russian(lang) {
        "Не хватает прав в этом чате, отправил в личные сообщения."
    } else {
        "Missing permissions in this chat, sent it to you privately instead."
    }
}

pub fn permission_denied(lang: &str) -> &'static str {
    if is_russian(lang) {
        "У бота нет прав отправлять медиа в этот чат."
    } else {
        "The bot does not have permission to send media in this chat."
    }
}
