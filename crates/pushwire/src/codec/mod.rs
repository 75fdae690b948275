// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Binary wire codec.
//!
//! Two formats are handled, both big-endian:
//!
//! ```text
//! Outbound notification (enhanced format)
//! +-----+---------------+-----------+-----------+-----------+-----------+---------+
//! | 0x01| identifier u32| expiry u32| tokLen u16| token 32B | len u16   | payload |
//! +-----+---------------+-----------+-----------+-----------+-----------+---------+
//!
//! Inbound feedback tuple (repeated)
//! +---------------+-----------+-----------+
//! | timestamp u32 | tokLen u16| token 32B |
//! +---------------+-----------+-----------+
//! ```
//!
//! Encoding is pure; nothing here touches a socket.

mod feedback;
mod notification;

pub use feedback::{
    decode_feedback, encode_feedback_tuple, FeedbackRecord, FeedbackTuples, FEEDBACK_TUPLE_LEN,
};
pub use notification::{
    encode_notification, encode_notification_into, NotificationFrame, COMMAND_ENHANCED,
    FRAME_HEADER_LEN,
};
