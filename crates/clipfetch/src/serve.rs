// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clipfetch serve` command implementation.
//!
//! Wires the whole pipeline together: the extraction engine, the dedup
//! store, the download worker pool, the Telegram long-polling dispatcher,
//! and the periodic sweepers. Supports graceful shutdown via signal
//! handlers.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clipfetch_config::ClipfetchConfig;
use clipfetch_core::ClipfetchError;
use clipfetch_dedup::{run_purge_loop, DedupStore};
use clipfetch_extract::{sweep, ExtractionEngine};
use clipfetch_job::{spawn_workers, JobContext};
use clipfetch_telegram::inbound::{self, InboundDeps};
use clipfetch_telegram::TelegramDelivery;
use tracing::info;

use crate::shutdown;

/// Queue slots per worker; beyond this, new requests are rejected with a
/// user-facing notice instead of queueing unboundedly.
const QUEUE_SLOTS_PER_WORKER: usize = 16;

/// Dedup store purge cadence.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the `clipfetch serve` command until a shutdown signal arrives.
pub async fn run_serve(config: ClipfetchConfig) -> Result<(), ClipfetchError> {
    init_tracing(&config.bot.log_level);
    info!(bot = %config.bot.name, "starting clipfetch serve");

    let delivery = Arc::new(TelegramDelivery::new(&config.telegram)?);
    let engine = Arc::new(ExtractionEngine::new(&config.extractor)?);
    let store = Arc::new(DedupStore::new());

    let ctx = Arc::new(JobContext {
        delivery: delivery.clone(),
        extractor: engine,
        config: config.download.clone(),
    });
    let workers = config.download.workers;
    let (queue, worker_handles) =
        spawn_workers(ctx, workers, workers * QUEUE_SLOTS_PER_WORKER);
    info!(workers, "download worker pool started");

    let sweeper = sweep::spawn_sweeper(
        PathBuf::from(&config.download.temp_root),
        config.sweep.clone(),
    );
    let purger = tokio::spawn(run_purge_loop(store.clone(), PURGE_INTERVAL));

    let deps = Arc::new(InboundDeps {
        store,
        queue,
        delivery: delivery.clone(),
    });
    let dispatcher = inbound::spawn_dispatcher(delivery.bot().clone(), deps);

    let cancel = shutdown::install_signal_handler();
    cancel.cancelled().await;

    info!("shutting down");
    dispatcher.abort();
    sweeper.abort();
    purger.abort();
    for handle in worker_handles {
        handle.abort();
    }
    info!("clipfetch serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clipfetch={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
