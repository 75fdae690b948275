// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Notification payloads.
//!
//! The payload body is opaque to this crate (typically a JSON document built
//! elsewhere). Only its encoded size matters: anything above
//! [`MAX_PAYLOAD_LEN`] bytes is rejected, never truncated.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::PushError;

/// Maximum payload size accepted by the gateway.
pub const MAX_PAYLOAD_LEN: usize = 256;

/// Default time the gateway keeps trying to deliver a notification.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Opaque notification body plus delivery hints.
///
/// Cloning shares the underlying bytes, so one payload can be sent to many
/// devices without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    bytes: Arc<[u8]>,
    expiry: Duration,
    simulation_only: bool,
}

impl Payload {
    /// Wrap encoded payload bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
            expiry: DEFAULT_EXPIRY,
            simulation_only: false,
        }
    }

    /// Wrap bytes and reject them immediately if they are too large.
    pub fn checked(bytes: impl Into<Vec<u8>>) -> Result<Self, PushError> {
        let payload = Self::new(bytes);
        payload.validate()?;
        Ok(payload)
    }

    /// Set how long the gateway should keep trying to deliver.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    /// Run the whole send path except the socket write.
    pub fn simulation_only(mut self) -> Self {
        self.simulation_only = true;
        self
    }

    /// Encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True for an empty body.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Delivery window.
    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// True when frames for this payload must not be written.
    pub fn is_simulation_only(&self) -> bool {
        self.simulation_only
    }

    /// Check the size limit.
    pub fn validate(&self) -> Result<(), PushError> {
        if self.bytes.len() > MAX_PAYLOAD_LEN {
            return Err(PushError::OversizedPayload {
                size: self.bytes.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(())
    }

    /// Absolute expiry for a frame built at `now`, in UNIX seconds.
    ///
    /// Saturates at `u32::MAX`; times before the epoch map to the TTL alone.
    pub fn expiry_timestamp(&self, now: SystemTime) -> u32 {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        now_secs
            .saturating_add(self.expiry.as_secs())
            .min(u64::from(u32::MAX)) as u32
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.bytes.len())
            .field("expiry", &self.expiry)
            .field("simulation_only", &self.simulation_only)
            .finish()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
