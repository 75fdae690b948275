// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use libfuzzer_sys::fuzz_target;
use pushwire::NotificationFrame;

fuzz_target!(|data: &[u8]| {
    // Slice decoder; whatever decodes must re-encode to the same bytes
    if let Ok(Some((frame, used))) = NotificationFrame::decode(data) {
        assert_eq!(frame.encode().ok().as_deref(), Some(&data[..used]));
    }

    // Streaming decoder
    let mut reader = data;
    while let Ok(Some(_)) = NotificationFrame::read_from(&mut reader) {}
});
