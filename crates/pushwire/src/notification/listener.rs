// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Progress callbacks for worker pools.
//!
//! Callbacks run on worker threads. Keep them short and never call
//! [`WorkerPool::wait_for_all`](crate::WorkerPool::wait_for_all) from one.

use crate::error::PushError;
use crate::notification::pool::{PoolMode, WorkerSnapshot};

/// Why a worker replaced its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// Frame budget per connection was used up.
    Proactive,
    /// A write failed and the engine reconnected.
    Recovery,
}

/// Observer of pool progress. Every method defaults to a no-op.
#[allow(unused_variables)]
pub trait ProgressListener: Send + Sync {
    /// The pool launched `workers` threads.
    fn on_pool_started(&self, mode: PoolMode, workers: usize) {}

    /// A worker thread began running.
    fn on_worker_started(&self, worker: &WorkerSnapshot) {}

    /// A worker thread finished (list done, critical error, or queue closed).
    fn on_worker_finished(&self, worker: &WorkerSnapshot) {}

    /// A worker replaced its connection.
    fn on_connection_restarted(&self, worker: u8, reason: RestartReason) {}

    /// The last running worker finished.
    fn on_all_finished(&self, workers: &[WorkerSnapshot]) {}

    /// A worker stopped because of `error`.
    fn on_critical_error(&self, worker: u8, error: &PushError) {}
}

/// Listener that forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ProgressListener for LoggingListener {
    fn on_pool_started(&self, mode: PoolMode, workers: usize) {
        log::info!("[pool] {:?} pool started with {} workers", mode, workers);
    }

    fn on_worker_finished(&self, worker: &WorkerSnapshot) {
        log::info!(
            "[pool] worker {} finished: {} sent, {} failed",
            worker.index,
            worker.successful,
            worker.failed
        );
    }

    fn on_connection_restarted(&self, worker: u8, reason: RestartReason) {
        log::debug!("[pool] worker {} restarted connection ({:?})", worker, reason);
    }

    fn on_all_finished(&self, workers: &[WorkerSnapshot]) {
        let sent: usize = workers.iter().map(|w| w.successful).sum();
        log::info!("[pool] all {} workers finished, {} sent", workers.len(), sent);
    }

    fn on_critical_error(&self, worker: u8, error: &PushError) {
        log::warn!("[pool] worker {} stopped: {}", worker, error);
    }
}
