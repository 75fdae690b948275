// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HTTP CONNECT tunnelling.
//!
//! ```text
//! client -> proxy : CONNECT gateway:2195 HTTP/1.0
//!                   User-Agent: pushwire/x.y
//!
//! proxy -> client : HTTP/1.0 200 Connection established
//!                   <headers...>
//!
//! ```
//!
//! After the blank line the socket carries raw bytes to the gateway and the
//! TLS handshake starts on it.

use std::io::{self, Read, Write};

use crate::error::PushError;

/// Upper bound on the proxy's reply header block.
const MAX_REPLY_LEN: usize = 8 * 1024;

/// Ask the proxy on `stream` to open a tunnel to `host:port`.
///
/// Returns once the proxy has answered `200`; any other status, an oversized
/// reply or EOF is a transport error.
pub fn open_tunnel<S: Read + Write + ?Sized>(
    stream: &mut S,
    host: &str,
    port: u16,
) -> Result<(), PushError> {
    let request = format!(
        "CONNECT {host}:{port} HTTP/1.0\r\nUser-Agent: pushwire/{}\r\n\r\n",
        crate::VERSION
    );
    stream.write_all(request.as_bytes())?;
    stream.flush()?;

    let reply = read_reply_head(stream)?;
    let status_line = reply.lines().next().unwrap_or_default();

    match parse_status(status_line) {
        Some(200) => {
            log::debug!("[proxy] tunnel to {}:{} established", host, port);
            Ok(())
        }
        Some(code) => Err(PushError::transport(
            io::ErrorKind::ConnectionRefused,
            format!("proxy refused tunnel to {}:{}: status {}", host, port, code),
        )),
        None => Err(PushError::transport(
            io::ErrorKind::InvalidData,
            format!("malformed proxy reply: {:?}", status_line),
        )),
    }
}

/// Read byte-by-byte up to and including the blank line so nothing that
/// belongs to the tunnel is consumed.
fn read_reply_head<S: Read + ?Sized>(stream: &mut S) -> Result<String, PushError> {
    let mut head = Vec::with_capacity(128);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") && !head.ends_with(b"\n\n") {
        if head.len() >= MAX_REPLY_LEN {
            return Err(PushError::transport(
                io::ErrorKind::InvalidData,
                "proxy reply header too large",
            ));
        }
        match stream.read(&mut byte) {
            Ok(0) => {
                return Err(PushError::transport(
                    io::ErrorKind::UnexpectedEof,
                    "proxy closed connection during CONNECT",
                ))
            }
            Ok(_) => head.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(String::from_utf8_lossy(&head).into_owned())
}

/// `HTTP/1.x <code> <reason>` -> `code`.
fn parse_status(line: &str) -> Option<u16> {
    let mut parts = line.split_whitespace();
    let version = parts.next()?;
    if !version.to_ascii_uppercase().starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
