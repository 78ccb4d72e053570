// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key builders for the dedup markers and the language cache.
//!
//! Keys are namespaced strings so a single store can hold all of them
//! without collisions.

/// Key for a webhook update identifier. Update ids are unique and monotonic
/// on the platform side; one marker per id suppresses platform redeliveries.
pub fn update_key(update_id: i64) -> String {
    format!("update:{update_id}")
}

/// Key for one user action: the chat + message + URL tuple. Suppresses
/// duplicate job dispatch when the same message is processed twice.
pub fn dispatch_key(chat_id: i64, message_id: i32, url: &str) -> String {
    format!("dispatch:{chat_id}:{message_id}:{url}")
}

/// Cache key for a user's language preference.
pub fn language_key(user_id: i64) -> String {
    format!("lang:{user_id}")
}
