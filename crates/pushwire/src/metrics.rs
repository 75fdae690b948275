// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Delivery metrics.
//!
//! One [`PushMetrics`] can be shared (via `Arc`) by a connection manager,
//! any number of engines and a feedback service:
//! - Connection statistics (established, failed, reconnections)
//! - Notification throughput
//! - Rejections and send errors
//!
//! # Example
//!
//! ```
//! use pushwire::PushMetrics;
//!
//! let metrics = PushMetrics::new();
//! metrics.record_connection_established();
//! metrics.record_notification_sent(77);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.connections_established, 1);
//! assert_eq!(snapshot.bytes_sent, 77);
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

/// Shared counters for push delivery.
#[derive(Debug)]
pub struct PushMetrics {
    // Connection metrics
    /// Number of currently open gateway connections
    active_connections: AtomicUsize,

    /// Total connections successfully established
    connections_established: AtomicU64,

    /// Total connection attempts that failed
    connections_failed: AtomicU64,

    /// Reconnections after a failed write
    reconnections: AtomicU64,

    /// Planned reconnections after a frame budget was used up
    proactive_restarts: AtomicU64,

    // Notification metrics
    /// Frames written and flushed
    notifications_sent: AtomicU64,

    /// Frame bytes written
    bytes_sent: AtomicU64,

    /// Frames skipped in simulation mode
    notifications_simulated: AtomicU64,

    /// Notifications rejected before I/O (bad token, oversized payload)
    notifications_rejected: AtomicU64,

    /// Failed write/flush attempts
    send_errors: AtomicU64,

    // Feedback metrics
    /// Feedback records decoded
    feedback_records: AtomicU64,

    /// When metrics collection started
    start_time: Instant,
}

impl PushMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self {
            active_connections: AtomicUsize::new(0),
            connections_established: AtomicU64::new(0),
            connections_failed: AtomicU64::new(0),
            reconnections: AtomicU64::new(0),
            proactive_restarts: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            notifications_simulated: AtomicU64::new(0),
            notifications_rejected: AtomicU64::new(0),
            send_errors: AtomicU64::new(0),
            feedback_records: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    // ========================================================================
    // Connection recording
    // ========================================================================

    /// Record a new connection established.
    pub fn record_connection_established(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection closed.
    pub fn record_connection_closed(&self) {
        // Saturating: a close without a matching open must not wrap
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Record a connection failure.
    pub fn record_connection_failed(&self) {
        self.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reconnection after a send failure.
    pub fn record_reconnection(&self) {
        self.reconnections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a planned reconnection.
    pub fn record_proactive_restart(&self) {
        self.proactive_restarts.fetch_add(1, Ordering::Relaxed);
    }

    // ========================================================================
    // Notification recording
    // ========================================================================

    /// Record a frame written and flushed.
    pub fn record_notification_sent(&self, bytes: usize) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a frame skipped because its payload is simulation-only.
    pub fn record_notification_simulated(&self) {
        self.notifications_simulated.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a notification rejected before I/O.
    pub fn record_notification_rejected(&self) {
        self.notifications_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed write or flush.
    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record decoded feedback records.
    pub fn record_feedback_records(&self, count: usize) {
        self.feedback_records
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    // ========================================================================
    // Getter
    // ========================================================================

    /// Get number of open connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Snapshot
    // ========================================================================

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> PushMetricsSnapshot {
        PushMetricsSnapshot {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            connections_failed: self.connections_failed.load(Ordering::Relaxed),
            reconnections: self.reconnections.load(Ordering::Relaxed),
            proactive_restarts: self.proactive_restarts.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            notifications_simulated: self.notifications_simulated.load(Ordering::Relaxed),
            notifications_rejected: self.notifications_rejected.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            feedback_records: self.feedback_records.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PushMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`PushMetrics`].
#[derive(Clone, Debug, Default)]
pub struct PushMetricsSnapshot {
    /// Open connections
    pub active_connections: usize,

    /// Connections established
    pub connections_established: u64,

    /// Connection failures
    pub connections_failed: u64,

    /// Reconnections after failures
    pub reconnections: u64,

    /// Planned reconnections
    pub proactive_restarts: u64,

    /// Frames sent
    pub notifications_sent: u64,

    /// Frame bytes sent
    pub bytes_sent: u64,

    /// Frames skipped in simulation mode
    pub notifications_simulated: u64,

    /// Notifications rejected before I/O
    pub notifications_rejected: u64,

    /// Failed writes or flushes
    pub send_errors: u64,

    /// Feedback records decoded
    pub feedback_records: u64,

    /// Uptime in seconds
    pub uptime_secs: f64,
}

impl PushMetricsSnapshot {
    /// Notifications per second since start.
    pub fn notification_rate(&self) -> f64 {
        if self.uptime_secs > 0.0 {
            self.notifications_sent as f64 / self.uptime_secs
        } else {
            0.0
        }
    }

    /// Calculate connection success rate.
    pub fn connection_success_rate(&self) -> f64 {
        let total = self.connections_established + self.connections_failed;
        if total > 0 {
            self.connections_established as f64 / total as f64
        } else {
            1.0
        }
    }
}
