// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration types.
//!
//! - [`ConnectionConfig`] - socket timeouts, TCP options and trust policy
//! - [`EngineConfig`] - retry policy of a single transmission engine
//! - [`PoolConfig`] - worker pool sizing and pacing
//!
//! # Example
//!
//! ```
//! use pushwire::{PoolConfig, EngineConfig};
//! use std::time::Duration;
//!
//! let config = PoolConfig::default()
//!     .with_workers(4)
//!     .with_max_notifications_per_connection(500)
//!     .with_engine(EngineConfig::default().with_retry_attempts(5));
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use crate::transport::tls::TrustPolicy;

/// Default number of write attempts per notification.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default socket read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of frames sent before a worker proactively reconnects.
pub const DEFAULT_MAX_NOTIFICATIONS_PER_CONNECTION: u32 = 200;

/// Largest pool: the worker index must fit in the top 8 identifier bits.
pub const MAX_WORKERS: usize = 255;

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Socket and TLS settings applied to every connection a manager opens.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// TCP connect timeout (per resolved address)
    pub connect_timeout: Duration,

    /// Read timeout on the established stream (None = block forever)
    pub read_timeout: Option<Duration>,

    /// Write timeout on the established stream (None = block forever)
    pub write_timeout: Option<Duration>,

    /// Enable TCP_NODELAY
    pub nodelay: bool,

    /// Enable TCP keep-alive probes
    pub keepalive: bool,

    /// Idle time before the first keep-alive probe
    pub keepalive_interval: Duration,

    /// Server certificate validation
    pub trust: TrustPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Some(DEFAULT_READ_TIMEOUT),
            write_timeout: Some(DEFAULT_READ_TIMEOUT),
            nodelay: true,
            keepalive: true,
            keepalive_interval: Duration::from_secs(60),
            trust: TrustPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Builder: set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder: set read timeout
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Builder: set write timeout
    pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Builder: set TCP_NODELAY
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Builder: set keepalive
    pub fn with_keepalive(mut self, enabled: bool, interval: Duration) -> Self {
        self.keepalive = enabled;
        self.keepalive_interval = interval;
        self
    }

    /// Builder: set trust policy
    pub fn with_trust(mut self, trust: TrustPolicy) -> Self {
        self.trust = trust;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.connect_timeout.is_zero() {
            return Err("connect_timeout must be > 0");
        }
        if self.read_timeout.is_some_and(|t| t.is_zero()) {
            return Err("read_timeout must be > 0 (use None to disable)");
        }
        if self.write_timeout.is_some_and(|t| t.is_zero()) {
            return Err("write_timeout must be > 0 (use None to disable)");
        }
        if self.keepalive && self.keepalive_interval.is_zero() {
            return Err("keepalive_interval must be > 0");
        }
        Ok(())
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Retry policy of a transmission engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Total write attempts per notification, including the first one
    pub retry_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl EngineConfig {
    /// Builder: set retry attempts
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.retry_attempts == 0 {
            return Err("retry_attempts must be >= 1");
        }
        Ok(())
    }
}

// ============================================================================
// PoolConfig
// ============================================================================

/// Worker pool settings.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of workers (each owns one connection)
    pub workers: usize,

    /// Frames per connection before a proactive reconnect (0 = never)
    pub max_notifications_per_connection: u32,

    /// Pause between two notifications of the same worker
    pub sleep_between_notifications: Duration,

    /// How long an idle queue worker waits before checking again
    pub queue_poll_interval: Duration,

    /// Thread name prefix; the worker index is appended
    pub thread_name_prefix: String,

    /// Per-worker engine policy
    pub engine: EngineConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            max_notifications_per_connection: DEFAULT_MAX_NOTIFICATIONS_PER_CONNECTION,
            sleep_between_notifications: Duration::ZERO,
            queue_poll_interval: Duration::from_secs(10),
            thread_name_prefix: "pushwire-worker".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl PoolConfig {
    /// Builder: set worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder: set proactive reconnect threshold
    pub fn with_max_notifications_per_connection(mut self, max: u32) -> Self {
        self.max_notifications_per_connection = max;
        self
    }

    /// Builder: set inter-notification pause
    pub fn with_sleep_between_notifications(mut self, pause: Duration) -> Self {
        self.sleep_between_notifications = pause;
        self
    }

    /// Builder: set idle poll interval for queue workers
    pub fn with_queue_poll_interval(mut self, interval: Duration) -> Self {
        self.queue_poll_interval = interval;
        self
    }

    /// Builder: set thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Builder: set engine policy
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.workers == 0 {
            return Err("workers must be >= 1");
        }
        if self.workers > MAX_WORKERS {
            return Err("workers must be <= 255");
        }
        if self.queue_poll_interval.is_zero() {
            return Err("queue_poll_interval must be > 0");
        }
        self.engine.validate()
    }
}
