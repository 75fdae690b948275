// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Feedback service client.
//!
//! The feedback server streams one 38-byte tuple per device that stopped
//! accepting notifications, then closes the connection. The list is cleared
//! once read, so two fetches in a row return different results.

use std::io;
use std::net::Shutdown;
use std::sync::Arc;

use crate::codec::{decode_feedback, FeedbackRecord, FEEDBACK_TUPLE_LEN};
use crate::error::PushError;
use crate::metrics::PushMetrics;
use crate::server::ServerDescriptor;
use crate::transport::{ByteStream, Connector};

const READ_CHUNK: usize = 4096;

/// Reads inactive-device records from a feedback server.
pub struct FeedbackService {
    connector: Arc<dyn Connector>,
    metrics: Option<Arc<PushMetrics>>,
}

impl FeedbackService {
    /// Create a service using `connector` for every fetch.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            metrics: None,
        }
    }

    /// Record fetched records in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PushMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Connect, drain the stream to EOF and decode every complete tuple.
    ///
    /// A trailing partial tuple is discarded. A read timeout is reported as
    /// a transport error.
    pub fn fetch(&self, server: &ServerDescriptor) -> Result<Vec<FeedbackRecord>, PushError> {
        let mut stream = self.connector.connect(server)?;
        let drained = drain(&mut *stream);
        let _ = stream.shutdown(Shutdown::Both);
        if let Some(m) = &self.metrics {
            m.record_connection_closed();
        }
        let bytes = drained?;

        let tuples = decode_feedback(&bytes);
        if tuples.trailing_len() != 0 {
            log::debug!(
                "[feedback] discarding {} trailing byte(s) from {}",
                tuples.trailing_len(),
                server
            );
        }
        let records: Vec<FeedbackRecord> = tuples.collect();

        if let Some(m) = &self.metrics {
            m.record_feedback_records(records.len());
        }
        log::info!(
            "[feedback] {} inactive device(s) reported by {}",
            records.len(),
            server
        );
        Ok(records)
    }
}

impl std::fmt::Debug for FeedbackService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackService")
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Read until EOF. A peer that closes without close_notify surfaces as
/// `UnexpectedEof` from rustls and counts as EOF too.
fn drain(stream: &mut dyn ByteStream) -> Result<Vec<u8>, PushError> {
    let mut bytes = Vec::with_capacity(FEEDBACK_TUPLE_LEN * 16);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => return Ok(bytes),
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(bytes),
            Err(e) => return Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
