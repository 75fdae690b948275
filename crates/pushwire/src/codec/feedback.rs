// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Feedback tuples: devices the gateway reports as unreachable.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::token::{DeviceToken, TOKEN_LEN};

/// Size of one feedback tuple on the wire.
pub const FEEDBACK_TUPLE_LEN: usize = 4 + 2 + TOKEN_LEN;

/// A device reported inactive by the feedback service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeedbackRecord {
    /// Device that stopped accepting notifications.
    pub token: DeviceToken,
    /// When the gateway determined the device was gone, UNIX seconds.
    pub timestamp: u32,
}

impl FeedbackRecord {
    /// `timestamp` as a `SystemTime`.
    pub fn inactive_since(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(u64::from(self.timestamp))
    }
}

/// Iterator over the complete tuples of a feedback stream.
///
/// Trailing bytes that do not form a whole tuple are ignored.
#[derive(Debug, Clone)]
pub struct FeedbackTuples<'a> {
    chunks: std::slice::ChunksExact<'a, u8>,
}

impl FeedbackTuples<'_> {
    /// Number of bytes that will be discarded at the end.
    pub fn trailing_len(&self) -> usize {
        self.chunks.remainder().len()
    }
}

impl Iterator for FeedbackTuples<'_> {
    type Item = FeedbackRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let tuple = self.chunks.next()?;
        let timestamp = u32::from_be_bytes([tuple[0], tuple[1], tuple[2], tuple[3]]);
        // tuple[4..6] carries the token length; always 32 in practice and
        // the fixed tuple size does not depend on it.
        let mut token = [0u8; TOKEN_LEN];
        token.copy_from_slice(&tuple[6..]);
        Some(FeedbackRecord {
            token: DeviceToken::from_bytes(token),
            timestamp,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl ExactSizeIterator for FeedbackTuples<'_> {}

/// Decode a feedback byte stream.
///
/// A stream of `k * 38 + r` bytes (`r < 38`) yields exactly `k` records.
pub fn decode_feedback(bytes: &[u8]) -> FeedbackTuples<'_> {
    FeedbackTuples {
        chunks: bytes.chunks_exact(FEEDBACK_TUPLE_LEN),
    }
}

/// Encode one feedback tuple, appending to `buf`.
pub fn encode_feedback_tuple(timestamp: u32, token: &DeviceToken, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(&(TOKEN_LEN as u16).to_be_bytes());
    buf.extend_from_slice(token.as_bytes());
}
