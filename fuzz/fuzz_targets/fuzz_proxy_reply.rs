// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use std::io::{self, Read, Write};

use libfuzzer_sys::fuzz_target;
use pushwire::transport::proxy::open_tunnel;

/// Proxy whose reply is the fuzz input.
struct Scripted<'a> {
    reply: &'a [u8],
}

impl Read for Scripted<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reply.read(buf)
    }
}

impl Write for Scripted<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let mut proxy = Scripted { reply: data };
    let _ = open_tunnel(&mut proxy, "gateway.push.apple.com", 2195);
});
