// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the clipfetch media relay bot.
//!
//! Provides the error taxonomy shared across the workspace, the common
//! identifier and media types, the [`DeliveryClient`] boundary trait, and
//! the inbound URL validator.

pub mod error;
pub mod traits;
pub mod types;
pub mod validate;

pub use error::{classify_error, is_permission_error, ClipfetchError, ErrorCategory};
pub use traits::DeliveryClient;
pub use types::{ChatId, DownloadRequest, ExtractionResult, MediaFile, MediaKind, MessageId, Platform};
pub use validate::{find_link, validate, ValidatedUrl};
