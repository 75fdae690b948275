// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transmission engine: one connection, sequential frames, retry on failure.
//!
//! # State machine
//!
//! ```text
//!                 initialize()
//!  Disconnected ---------------> Connected
//!       ^                            |
//!       |  stop() / retries          |  write fails, attempts left:
//!       |  exhausted                 |  close, reconnect, same frame again
//!       +----------------------------+
//! ```
//!
//! Token validation and frame encoding happen before any I/O, so a bad token
//! or an oversized payload never costs a reconnect.

use std::fmt;
use std::io::Write;
use std::net::Shutdown;
use std::sync::Arc;
use std::time::SystemTime;

use crate::codec::encode_notification_into;
use crate::config::EngineConfig;
use crate::error::PushError;
use crate::metrics::PushMetrics;
use crate::notification::identifier::MessageIdGenerator;
use crate::notification::outcome::PushOutcome;
use crate::payload::Payload;
use crate::server::ServerDescriptor;
use crate::token::DeviceToken;
use crate::transport::{BoxedByteStream, ByteStream, Connector};

/// Connection state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No open transport.
    Disconnected,
    /// Transport open and usable.
    Connected,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// What one successful `send` cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendReport {
    /// Write attempts, including the successful one (0 when simulated).
    pub attempts: u32,
    /// Connections opened to recover from failed attempts.
    pub reconnects: u32,
    /// Encoded frame size.
    pub frame_len: usize,
    /// True when the payload was simulation-only and nothing was written.
    pub simulated: bool,
}

/// Lifetime counters of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Frames written and flushed.
    pub frames_sent: u64,
    /// Frames skipped because the payload was simulation-only.
    pub frames_simulated: u64,
    /// Notifications rejected before I/O.
    pub frames_rejected: u64,
    /// Failed write or flush attempts.
    pub write_failures: u64,
    /// Connections opened by `initialize`/`restart_connection`.
    pub connections_opened: u64,
    /// Connections opened while retrying a frame.
    pub reconnections: u64,
}

/// Sends notifications over one exclusively owned connection.
pub struct TransmissionEngine {
    connector: Arc<dyn Connector>,
    config: EngineConfig,
    server: Option<ServerDescriptor>,
    stream: Option<BoxedByteStream>,
    ids: MessageIdGenerator,
    stats: EngineStats,
    metrics: Option<Arc<PushMetrics>>,
    frame: Vec<u8>,
}

impl TransmissionEngine {
    /// Create a disconnected engine.
    pub fn new(connector: Arc<dyn Connector>, config: EngineConfig) -> Self {
        Self {
            connector,
            config,
            server: None,
            stream: None,
            ids: MessageIdGenerator::standalone(),
            stats: EngineStats::default(),
            metrics: None,
            frame: Vec::with_capacity(crate::codec::FRAME_HEADER_LEN + crate::MAX_PAYLOAD_LEN),
        }
    }

    /// Record delivery events in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PushMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        if self.stream.is_some() {
            EngineState::Connected
        } else {
            EngineState::Disconnected
        }
    }

    /// True while a transport is open.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Descriptor given to the last `initialize`.
    pub fn server(&self) -> Option<&ServerDescriptor> {
        self.server.as_ref()
    }

    /// Lifetime counters.
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Retry policy.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open a connection to `server`.
    ///
    /// An already open connection is closed first. The descriptor is kept
    /// even if connecting fails, so later sends and restarts target it.
    pub fn initialize(&mut self, server: ServerDescriptor) -> Result<(), PushError> {
        self.config
            .validate()
            .map_err(|e| PushError::Config(e.to_string()))?;
        self.close_stream();

        let result = self.connector.connect(&server);
        self.server = Some(server);
        let stream = result?;

        self.stream = Some(stream);
        self.stats.connections_opened += 1;
        Ok(())
    }

    /// Close the connection. Idempotent.
    pub fn stop(&mut self) {
        if self.stream.is_some() {
            if let Some(server) = &self.server {
                log::debug!("[engine] closing connection to {}", server);
            }
        }
        self.close_stream();
    }

    /// Close and reopen the connection to the same descriptor.
    pub fn restart_connection(&mut self) -> Result<(), PushError> {
        let server = self.server.clone().ok_or(PushError::NotConnected)?;
        self.stop();
        self.initialize(server)
    }

    /// Send one notification.
    ///
    /// Fails without I/O on an invalid token or oversized payload. Transport
    /// failures close the connection and the same frame is retried on a new
    /// one until `retry_attempts` is reached; the last error is returned and
    /// the engine is left disconnected.
    pub fn send(
        &mut self,
        token: &str,
        payload: &Payload,
        identifier: u32,
    ) -> Result<SendReport, PushError> {
        let device = match DeviceToken::parse(token) {
            Ok(device) => device,
            Err(e) => return Err(self.reject(e)),
        };

        self.frame.clear();
        let expiry = payload.expiry_timestamp(SystemTime::now());
        if let Err(e) =
            encode_notification_into(&device, payload.as_bytes(), identifier, expiry, &mut self.frame)
        {
            return Err(self.reject(e));
        }

        let server = self.server.clone().ok_or(PushError::NotConnected)?;

        if payload.is_simulation_only() {
            self.stats.frames_simulated += 1;
            if let Some(m) = &self.metrics {
                m.record_notification_simulated();
            }
            log::debug!("[engine] simulated #{} to {}", identifier, device);
            return Ok(SendReport {
                frame_len: self.frame.len(),
                simulated: true,
                ..SendReport::default()
            });
        }

        let limit = self.config.retry_attempts.max(1);
        let mut report = SendReport {
            frame_len: self.frame.len(),
            ..SendReport::default()
        };

        loop {
            report.attempts += 1;
            match self.attempt(&server, &mut report) {
                Ok(()) => {
                    self.stats.frames_sent += 1;
                    if let Some(m) = &self.metrics {
                        m.record_notification_sent(report.frame_len);
                    }
                    log::trace!(
                        "[engine] sent #{} to {} (attempt {})",
                        identifier,
                        device,
                        report.attempts
                    );
                    return Ok(report);
                }
                Err(e) => {
                    self.close_stream();
                    if !e.is_retryable() || report.attempts >= limit {
                        log::warn!(
                            "[engine] giving up on #{} to {} after {} attempt(s): {}",
                            identifier,
                            server,
                            report.attempts,
                            e
                        );
                        return Err(e);
                    }
                    log::info!(
                        "[engine] attempt {}/{} to {} failed: {}; reconnecting",
                        report.attempts,
                        limit,
                        server,
                        e
                    );
                }
            }
        }
    }

    /// Send and capture the result in an outcome.
    pub fn push(&mut self, token: &str, payload: &Payload, identifier: u32) -> PushOutcome {
        let error = self.send(token, payload, identifier).err();
        PushOutcome::new(token, payload.clone(), identifier, error)
    }

    /// [`push`](Self::push) with the engine's own identifier sequence.
    pub fn push_next(&mut self, token: &str, payload: &Payload) -> PushOutcome {
        let identifier = self.ids.next_id();
        self.push(token, payload, identifier)
    }

    /// Send `payload` to every token over this connection, then close it.
    ///
    /// Always returns one outcome per token.
    pub fn push_all<I, S>(&mut self, payload: &Payload, tokens: I) -> Vec<PushOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let outcomes = tokens
            .into_iter()
            .map(|token| self.push_next(token.as_ref(), payload))
            .collect();
        self.stop();
        outcomes
    }

    /// One write attempt, reconnecting first if the previous attempt closed
    /// the transport.
    fn attempt(
        &mut self,
        server: &ServerDescriptor,
        report: &mut SendReport,
    ) -> Result<(), PushError> {
        if self.stream.is_none() {
            let stream = self.connector.connect(server)?;
            self.stream = Some(stream);
            report.reconnects += 1;
            self.stats.reconnections += 1;
            if let Some(m) = &self.metrics {
                m.record_reconnection();
            }
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(PushError::NotConnected);
        };
        let written = stream.write_all(&self.frame).and_then(|()| stream.flush());
        if let Err(e) = written {
            self.stats.write_failures += 1;
            if let Some(m) = &self.metrics {
                m.record_send_error();
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn reject(&mut self, error: PushError) -> PushError {
        self.stats.frames_rejected += 1;
        if let Some(m) = &self.metrics {
            m.record_notification_rejected();
        }
        log::debug!("[engine] rejected notification: {}", error);
        error
    }

    fn close_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            if let Some(m) = &self.metrics {
                m.record_connection_closed();
            }
        }
    }
}

impl Drop for TransmissionEngine {
    fn drop(&mut self) {
        self.close_stream();
    }
}

impl fmt::Debug for TransmissionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransmissionEngine")
            .field("state", &self.state())
            .field("server", &self.server)
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
