// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use pushwire::{decode_feedback, FEEDBACK_TUPLE_LEN};

fuzz_target!(|data: &[u8]| {
    let tuples = decode_feedback(data);
    assert_eq!(tuples.len(), data.len() / FEEDBACK_TUPLE_LEN);
    assert_eq!(tuples.trailing_len(), data.len() % FEEDBACK_TUPLE_LEN);
    for record in tuples {
        let _ = record.inactive_since();
    }
});
