// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Time-windowed idempotency store.
//!
//! A presence marker for "this side effect already happened": webhook
//! updates, job dispatches, and the language-preference cache all key into
//! the same store with different TTLs. Presence of a non-expired record
//! means "do not repeat the associated side effect".
//!
//! The store is the one piece of genuinely shared mutable state between the
//! inbound handler and the worker pool; `check_and_mark` is atomic per key
//! via the dashmap entry API, so concurrent deliveries of the same update
//! produce at most one side effect within a process.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

pub mod keys;

/// TTL for webhook update identifiers.
pub const UPDATE_TTL: Duration = Duration::from_secs(24 * 3600);
/// TTL for chat+message+URL dispatch keys.
pub const DISPATCH_TTL: Duration = Duration::from_secs(3600);
/// TTL for language preferences.
pub const LANGUAGE_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

/// A concurrent key/value store with per-entry expiry.
#[derive(Debug, Default)]
pub struct DedupStore {
    markers: DashMap<String, Instant>,
    values: DashMap<String, (String, Instant)>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when a non-expired marker exists for `key`.
    pub fn seen(&self, key: &str) -> bool {
        match self.markers.get(key) {
            Some(expiry) => *expiry > Instant::now(),
            None => false,
        }
    }

    /// Records a marker for `key` that expires after `ttl`.
    pub fn mark(&self, key: &str, ttl: Duration) {
        self.markers.insert(key.to_string(), Instant::now() + ttl);
    }

    /// Atomically checks and marks `key`.
    ///
    /// Returns `true` for exactly one caller per key per TTL window; every
    /// other concurrent or subsequent caller gets `false`. The entry API
    /// holds the shard lock across the check and the write.
    pub fn check_and_mark(&self, key: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut won = false;
        self.markers
            .entry(key.to_string())
            .and_modify(|expiry| {
                if *expiry <= now {
                    // Expired marker: this caller wins the new window.
                    *expiry = now + ttl;
                    won = true;
                }
            })
            .or_insert_with(|| {
                won = true;
                now + ttl
            });
        won
    }

    /// Removes a marker or cached value early, forcing the next check to
    /// re-run the side effect.
    pub fn invalidate(&self, key: &str) {
        self.markers.remove(key);
        self.values.remove(key);
    }

    /// Returns a cached value if present and not expired.
    pub fn get_cached(&self, key: &str) -> Option<String> {
        let entry = self.values.get(key)?;
        let (value, expiry) = entry.value();
        if *expiry > Instant::now() {
            Some(value.clone())
        } else {
            None
        }
    }

    /// Caches a value under `key` for `ttl`.
    pub fn put_cached(&self, key: &str, value: &str, ttl: Duration) {
        self.values
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
    }

    /// Evicts every expired entry. Called periodically; correctness does
    /// not depend on it since reads check expiry themselves.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.markers.len() + self.values.len();
        self.markers.retain(|_, expiry| *expiry > now);
        self.values.retain(|_, (_, expiry)| *expiry > now);
        let after = self.markers.len() + self.values.len();
        if before != after {
            debug!(evicted = before - after, "purged expired dedup entries");
        }
    }

    /// Number of live marker entries (for tests and diagnostics).
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Runs `purge_expired` on a fixed interval until the store is dropped by
/// every other holder. Spawn this from the binary.
pub async fn run_purge_loop(store: std::sync::Arc<DedupStore>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        store.purge_expired();
    }
}
