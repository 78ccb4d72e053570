// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for clipfetch, plus the retryability classifier.
//!
//! The extractor binary does not report structured error codes, so retry
//! decisions are made by substring heuristics over error messages. That
//! heuristic is centralized in [`classify_error`] so it stays in one place
//! and can be unit-tested on its own.

use thiserror::Error;

/// The primary error type used across all clipfetch crates.
#[derive(Debug, Error)]
pub enum ClipfetchError {
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// The extractor binary could not be resolved to an executable path.
    #[error("extractor binary not found: {0}")]
    ExtractorNotFound(String),

    /// A single extraction strategy failed. Caught and logged inside the
    /// cascade; never propagated past the engine on its own.
    #[error("strategy `{strategy}` failed: {message}")]
    Strategy { strategy: String, message: String },

    /// Every strategy in the cascade failed for this URL.
    #[error("all extraction strategies exhausted for {url}")]
    StrategiesExhausted { url: String },

    /// External process execution errors (spawn failure, non-zero exit).
    #[error("process error: {message}")]
    Process {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Delivery platform errors (send/delete failures, permission denials).
    #[error("delivery error: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation exceeded its time budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Filesystem errors from work-directory and output handling.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Retryability category assigned to a failed job attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Timeout, connection, or DNS failure.
    Network,
    /// The platform is throttling us.
    RateLimited,
    /// The extractor failed in a way that tends to resolve on retry.
    ExtractorTransient,
    /// Private, removed, or nonexistent content. Never retried.
    ContentUnavailable,
    /// The extractor binary could not be found. Fatal for the attempt.
    Resolution,
    /// Anything unrecognized. Treated as fatal.
    Unknown,
}

impl ErrorCategory {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCategory::Network | ErrorCategory::RateLimited | ErrorCategory::ExtractorTransient
        )
    }
}

/// Substring signatures for content that will never become available.
const CONTENT_SIGNATURES: &[&str] = &[
    "private",
    "login required",
    "login_required",
    "requested content is not available",
    "video unavailable",
    "content unavailable",
    "not found",
    "404",
    "has been removed",
    "account has been terminated",
    "unsupported url",
];

/// Substring signatures for network-level transients.
const NETWORK_SIGNATURES: &[&str] = &[
    "timed out",
    "timeout",
    "connection refused",
    "connection reset",
    "connection aborted",
    "network is unreachable",
    "temporary failure in name resolution",
    "name or service not known",
    "getaddrinfo",
    "ssl",
    "eof occurred",
];

/// Substring signatures for rate limiting.
const RATE_LIMIT_SIGNATURES: &[&str] = &[
    "429",
    "too many requests",
    "rate limit",
    "rate-limit",
    "please wait a few minutes",
];

/// Substring signatures for extractor failures that tend to be transient.
const EXTRACTOR_TRANSIENT_SIGNATURES: &[&str] = &[
    "unable to extract",
    "unable to download webpage",
    "http error 5",
    "fragment",
    "incomplete read",
    "server error",
    "temporarily blocked",
];

/// Classifies an error into a retryability category.
///
/// Order matters: content-state signatures are checked first so that
/// "video unavailable (timed out loading)" style messages do not get
/// retried forever.
pub fn classify_error(err: &ClipfetchError) -> ErrorCategory {
    if matches!(err, ClipfetchError::ExtractorNotFound(_)) {
        return ErrorCategory::Resolution;
    }
    if matches!(err, ClipfetchError::Timeout { .. }) {
        return ErrorCategory::Network;
    }
    // A fully exhausted cascade is usually a temporary platform block;
    // the per-strategy causes were already logged and swallowed.
    if matches!(err, ClipfetchError::StrategiesExhausted { .. }) {
        return ErrorCategory::ExtractorTransient;
    }

    let message = err.to_string().to_lowercase();

    if CONTENT_SIGNATURES.iter().any(|s| message.contains(s)) {
        return ErrorCategory::ContentUnavailable;
    }
    if RATE_LIMIT_SIGNATURES.iter().any(|s| message.contains(s)) {
        return ErrorCategory::RateLimited;
    }
    if NETWORK_SIGNATURES.iter().any(|s| message.contains(s)) {
        return ErrorCategory::Network;
    }
    if EXTRACTOR_TRANSIENT_SIGNATURES.iter().any(|s| message.contains(s)) {
        return ErrorCategory::ExtractorTransient;
    }

    ErrorCategory::Unknown
}

/// Telegram Bot API signatures for group-permission failures.
const PERMISSION_SIGNATURES: &[&str] = &[
    "not enough rights",
    "have no rights",
    "chat_write_forbidden",
    "bot was kicked",
    "bot is not a member",
];

/// Returns true when a delivery error is a group-chat permission denial,
/// which routes the job to its private-chat fallback path.
pub fn is_permission_error(err: &ClipfetchError) -> bool {
    let message = err.to_string().to_lowercase();
    PERMISSION_SIGNATURES.iter().any(|s| message.contains(s))
}
