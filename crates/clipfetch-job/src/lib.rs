// SPDX-FileCopyrightText: 2026 Clipfetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Download orchestration.
//!
//! A queued, retryable unit of work drives the extraction engine, classifies
//! results, enforces upload size limits, and delegates delivery. The worker
//! pool consumes the queue; failed retryable attempts are re-enqueued with
//! platform-specific backoff from a detached task so no worker sleeps
//! through a backoff window.

pub mod job;
pub mod notices;
pub mod worker;

pub use job::{run_job, Extractor, JobContext, JobOutcome};
pub use worker::{spawn_workers, JobQueue};
