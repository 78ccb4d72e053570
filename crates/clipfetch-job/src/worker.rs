// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The download worker pool.
//!
//! A bounded queue feeds a fixed set of workers. Retryable failures are
//! re-enqueued from a detached task after their backoff so the worker that
//! hit the failure moves straight on to the next job.

use std::sync::Arc;

use clipfetch_core::DownloadRequest;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::job::{run_job, JobContext, JobOutcome};

/// Producer handle to the download queue.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<DownloadRequest>,
}

impl JobQueue {
    /// Enqueues a request. Returns false when the queue is full or closed;
    /// the caller decides what to tell the user.
    pub async fn enqueue(&self, request: DownloadRequest) -> bool {
        match self.tx.try_send(request) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(request)) => {
                warn!(chat = request.chat.0, "download queue full, rejecting request");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("download queue closed, rejecting request");
                false
            }
        }
    }
}

/// Spawns `workers` consumers over a bounded queue of `capacity` requests.
///
/// Workers run until the last producer handle (including pending retry
/// tasks) is dropped and the queue drains.
pub fn spawn_workers(
    ctx: Arc<JobContext>,
    workers: usize,
    capacity: usize,
) -> (JobQueue, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel::<DownloadRequest>(capacity);
    let rx = Arc::new(Mutex::new(rx));

    let mut handles = Vec::with_capacity(workers);
    for id in 0..workers {
        let ctx = ctx.clone();
        let rx = rx.clone();
        let retry_tx = tx.clone();
        handles.push(tokio::spawn(async move {
            debug!(worker = id, "download worker started");
            loop {
                let request = {
                    let mut rx = rx.lock().await;
                    rx.recv().await
                };
                let Some(request) = request else {
                    break;
                };
                if let JobOutcome::Retry(delay) = run_job(&ctx, &request).await {
                    let retry_tx = retry_tx.clone();
                    let next = request.next_attempt();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        if retry_tx.send(next).await.is_err() {
                            warn!("queue closed, dropping scheduled retry");
                        }
                    });
                }
            }
            info!(worker = id, "download worker stopped");
        }));
    }

    (JobQueue { tx }, handles)
}
