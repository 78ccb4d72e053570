// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound URL validation.
//!
//! Classifies arbitrary user-supplied text as a supported media link or
//! rejects it. Pure functions, no side effects; rejection is an absence
//! value, not an error, so callers can answer with a plain "invalid link"
//! message without triggering retries or error-level logging.

use url::Url;

use crate::types::Platform;

/// Hosts accepted for each platform. Matching is exact after stripping one
/// leading `www.` from both sides -- never a suffix match, so confusable
/// hosts like `notinstagram.com` or `instagram.com.evil.net` are rejected.
const ALLOWED_HOSTS: &[(&str, Platform)] = &[
    ("instagram.com", Platform::Instagram),
    ("tiktok.com", Platform::TikTok),
    ("vm.tiktok.com", Platform::TikTok),
    ("vt.tiktok.com", Platform::TikTok),
];

/// A URL that passed validation, with its normalized form and platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    url: Url,
    platform: Platform,
}

impl ValidatedUrl {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.url.fmt(f)
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Validates raw text as a supported media link.
///
/// Prepends `https://` when the input has no `http(s)://` prefix, parses the
/// host, and checks it against the allow-list.
pub fn validate(raw_text: &str) -> Option<ValidatedUrl> {
    let trimmed = raw_text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate).ok()?;
    let host = url.host_str()?.to_lowercase();
    let host = strip_www(&host);

    let platform = ALLOWED_HOSTS
        .iter()
        .find(|(allowed, _)| strip_www(allowed) == host)
        .map(|(_, platform)| *platform)?;

    Some(ValidatedUrl { url, platform })
}

/// Finds the first supported link in a message.
///
/// Tries the whole trimmed text first (the common case of a bare pasted
/// link), then each whitespace-separated token.
pub fn find_link(text: &str) -> Option<ValidatedUrl> {
    if let Some(valid) = validate(text) {
        return Some(valid);
    }
    text.split_whitespace().find_map(validate)
}
