// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # pushwire - binary push gateway client
//!
//! Client for the legacy binary push-notification gateway: TLS connections
//! authenticated by a client certificate, the enhanced notification frame,
//! multi-threaded bulk delivery and the feedback service.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pushwire::{
//!     ConnectionConfig, ConnectionManager, CredentialFormat, EngineConfig, Environment,
//!     FileCredentials, Payload, Result, ServerDescriptor, TransmissionEngine,
//! };
//!
//! fn main() -> Result<()> {
//!     let credentials = Arc::new(FileCredentials::new("push.pem", CredentialFormat::Pem));
//!     let gateway = ServerDescriptor::notification(Environment::Sandbox, credentials);
//!     let manager = Arc::new(ConnectionManager::new(ConnectionConfig::default())?);
//!
//!     let mut engine = TransmissionEngine::new(manager, EngineConfig::default());
//!     engine.initialize(gateway)?;
//!     let report = engine.send(&"a".repeat(64), &Payload::from(r#"{"aps":{"alert":"hi"}}"#), 1)?;
//!     println!("sent in {} attempt(s)", report.attempts);
//!     engine.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |   WorkerPool (list / queue)            FeedbackService              |
//! |        |  one thread per worker               |                     |
//! |   TransmissionEngine (retry, reconnect)       |                     |
//! +---------------------------------------------------------------------+
//! |   Connector  <- ConnectionManager: TLS context cache, proxy, socket |
//! +---------------------------------------------------------------------+
//! |   codec: notification frames out, feedback tuples in                |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ServerDescriptor`] | Host, port, credentials and optional proxy |
//! | [`ConnectionManager`] | Opens authenticated TLS streams |
//! | [`TransmissionEngine`] | Sends frames over one connection with retries |
//! | [`WorkerPool`] | Parallel delivery over N connections |
//! | [`FeedbackService`] | Fetches inactive device tokens |
//!
//! The library only emits `log` records; installing a logger is up to the
//! application.

/// Binary wire codec (notification frames, feedback tuples).
pub mod codec;
/// Connection, engine and pool settings.
pub mod config;
/// Error types.
pub mod error;
/// Feedback service client.
pub mod feedback;
/// Delivery counters.
pub mod metrics;
/// Engines, pools, outcomes and progress listeners.
pub mod notification;
/// Opaque notification payloads.
pub mod payload;
/// Gateway endpoints and credentials.
pub mod server;
/// Device tokens.
pub mod token;
/// TCP, proxy tunnel and TLS plumbing.
pub mod transport;

pub use codec::{
    decode_feedback, encode_feedback_tuple, encode_notification, FeedbackRecord,
    NotificationFrame, FEEDBACK_TUPLE_LEN,
};
pub use config::{
    ConnectionConfig, EngineConfig, PoolConfig, DEFAULT_MAX_NOTIFICATIONS_PER_CONNECTION,
    DEFAULT_READ_TIMEOUT, DEFAULT_RETRY_ATTEMPTS, MAX_WORKERS,
};
pub use error::{CredentialError, PushError, Result};
pub use feedback::FeedbackService;
pub use metrics::{PushMetrics, PushMetricsSnapshot};
pub use notification::{
    EngineState, EngineStats, LoggingListener, PoolMode, ProgressListener, PushMessage,
    PushOutcome, RestartReason, SendReport, TransmissionEngine, WorkerPool, WorkerSnapshot,
};
pub use payload::{Payload, DEFAULT_EXPIRY, MAX_PAYLOAD_LEN};
pub use server::{
    CredentialFormat, CredentialMaterial, CredentialProvider, Environment, FileCredentials,
    ProxyConfig, ServerDescriptor, StaticCredentials, FEEDBACK_PORT, GATEWAY_PORT,
};
pub use token::DeviceToken;
pub use transport::{ConnectionManager, Connector, TrustPolicy};

/// Crate version, sent in the proxy CONNECT `User-Agent`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
