// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-device delivery outcomes.

use std::fmt;

use crate::error::PushError;
use crate::payload::Payload;

/// Result of one notification attempt.
///
/// Success means the frame was written and flushed; the gateway never
/// acknowledges individual frames.
#[derive(Clone)]
pub struct PushOutcome {
    token: String,
    payload: Payload,
    identifier: u32,
    error: Option<PushError>,
}

impl PushOutcome {
    /// Build an outcome; `error` of `None` means success.
    pub fn new(
        token: impl Into<String>,
        payload: Payload,
        identifier: u32,
        error: Option<PushError>,
    ) -> Self {
        Self {
            token: token.into(),
            payload,
            identifier,
            error,
        }
    }

    /// Device token as supplied by the caller.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Payload that was (or would have been) sent.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Frame identifier.
    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    /// Captured error, if the attempt failed.
    pub fn error(&self) -> Option<&PushError> {
        self.error.as_ref()
    }

    /// True when no error was captured.
    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Debug for PushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushOutcome")
            .field("token", &self.token)
            .field("identifier", &format_args!("{:#010x}", self.identifier))
            .field("payload_len", &self.payload.len())
            .field("error", &self.error)
            .finish()
    }
}

impl fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "#{} to {}: sent", self.identifier, self.token),
            Some(e) => write!(f, "#{} to {}: failed ({})", self.identifier, self.token, e),
        }
    }
}
