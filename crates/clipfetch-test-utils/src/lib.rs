// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for clipfetch crates.

pub mod mock_delivery;

pub use mock_delivery::{MockDelivery, SentItem};
