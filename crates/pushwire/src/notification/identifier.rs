// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message identifiers.
//!
//! Pooled workers tag every frame with
//!
//! ```text
//!  31        24 23                       0
//! +------------+--------------------------+
//! | worker idx |      sequence (24 bit)   |
//! +------------+--------------------------+
//! ```
//!
//! Worker indices start at 1 and sequences start at 1, so identifiers are
//! unique across a pool of up to 255 workers as long as no worker sends more
//! than 2^24 frames. A standalone engine uses a plain 32-bit sequence.

/// Bit position of the worker index.
pub const WORKER_INDEX_SHIFT: u32 = 24;

/// Mask of the per-worker sequence.
pub const SEQUENCE_MASK: u32 = (1 << WORKER_INDEX_SHIFT) - 1;

/// Combine a worker index and a sequence number.
pub const fn compose(worker: u8, sequence: u32) -> u32 {
    ((worker as u32) << WORKER_INDEX_SHIFT) | (sequence & SEQUENCE_MASK)
}

/// Worker index encoded in a pooled identifier.
pub const fn worker_of(identifier: u32) -> u8 {
    (identifier >> WORKER_INDEX_SHIFT) as u8
}

/// Sequence encoded in a pooled identifier.
pub const fn sequence_of(identifier: u32) -> u32 {
    identifier & SEQUENCE_MASK
}

/// Hands out identifiers for one engine.
#[derive(Debug, Clone)]
pub struct MessageIdGenerator {
    worker: Option<u8>,
    next: u32,
}

impl MessageIdGenerator {
    /// Generator for pool worker `index` (1..=255).
    pub fn for_worker(index: u8) -> Self {
        Self {
            worker: Some(index),
            next: 1,
        }
    }

    /// Plain sequence starting at 1.
    pub fn standalone() -> Self {
        Self {
            worker: None,
            next: 1,
        }
    }

    /// Next identifier.
    pub fn next_id(&mut self) -> u32 {
        match self.worker {
            Some(index) => {
                let id = compose(index, self.next);
                self.next = self.next.wrapping_add(1) & SEQUENCE_MASK;
                id
            }
            None => {
                let id = self.next;
                self.next = self.next.wrapping_add(1);
                id
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_worker_layout() {
        let mut ids = MessageIdGenerator::for_worker(3);
        assert_eq!(ids.next_id(), 0x0300_0001);
        assert_eq!(ids.next_id(), 0x0300_0002);
        assert_eq!(worker_of(0x0300_0002), 3);
        assert_eq!(sequence_of(0x0300_0002), 2);
    }

    #[test]
    fn test_standalone_sequence() {
        let mut ids = MessageIdGenerator::standalone();
        assert_eq!((ids.next_id(), ids.next_id(), ids.next_id()), (1, 2, 3));
    }

    #[test]
    fn test_unique_across_workers() {
        let mut seen = HashSet::new();
        for worker in 1..=16u8 {
            let mut ids = MessageIdGenerator::for_worker(worker);
            for _ in 0..500 {
                assert!(seen.insert(ids.next_id()));
            }
        }
        assert_eq!(seen.len(), 16 * 500);
    }

    #[test]
    fn test_sequence_stays_in_24_bits() {
        let mut ids = MessageIdGenerator::for_worker(255);
        ids.next = SEQUENCE_MASK;
        assert_eq!(ids.next_id(), 0xFFFF_FFFF);
        // Wraps without touching the worker byte
        assert_eq!(worker_of(ids.next_id()), 255);
    }
}
