// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound notification frames.

use std::io::{self, Read};

use crate::error::PushError;
use crate::payload::MAX_PAYLOAD_LEN;
use crate::token::{DeviceToken, TOKEN_LEN};

/// Command byte of the enhanced notification format.
pub const COMMAND_ENHANCED: u8 = 1;

/// Bytes before the token: command, identifier, expiry, token length.
const PREFIX_LEN: usize = 1 + 4 + 4 + 2;

/// Fixed part of a frame (everything except the payload).
pub const FRAME_HEADER_LEN: usize = PREFIX_LEN + TOKEN_LEN + 2;

/// Encode one notification frame.
///
/// Fails with [`PushError::OversizedPayload`] before producing any bytes when
/// `payload` exceeds the protocol limit.
pub fn encode_notification(
    token: &DeviceToken,
    payload: &[u8],
    identifier: u32,
    expiry: u32,
) -> Result<Vec<u8>, PushError> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    encode_notification_into(token, payload, identifier, expiry, &mut buf)?;
    Ok(buf)
}

/// Encode one notification frame, appending to `buf`.
///
/// `buf` is left untouched on error.
pub fn encode_notification_into(
    token: &DeviceToken,
    payload: &[u8],
    identifier: u32,
    expiry: u32,
    buf: &mut Vec<u8>,
) -> Result<(), PushError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(PushError::OversizedPayload {
            size: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    buf.reserve(FRAME_HEADER_LEN + payload.len());
    buf.push(COMMAND_ENHANCED);
    buf.extend_from_slice(&identifier.to_be_bytes());
    buf.extend_from_slice(&expiry.to_be_bytes());
    buf.extend_from_slice(&(TOKEN_LEN as u16).to_be_bytes());
    buf.extend_from_slice(token.as_bytes());
    buf.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(())
}

/// A decoded notification frame.
///
/// The client never reads these off the wire; the decoder serves gateway-side
/// tooling and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationFrame {
    /// Message identifier.
    pub identifier: u32,
    /// Expiry, UNIX seconds.
    pub expiry: u32,
    /// Destination device.
    pub token: DeviceToken,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl NotificationFrame {
    /// Encode this frame.
    pub fn encode(&self) -> Result<Vec<u8>, PushError> {
        encode_notification(&self.token, &self.payload, self.identifier, self.expiry)
    }

    /// Encoded length.
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LEN + self.payload.len()
    }

    /// Decode one frame from the start of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed, or `Ok(None)` when
    /// `buf` does not yet hold a complete frame.
    pub fn decode(buf: &[u8]) -> Result<Option<(Self, usize)>, PushError> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let (identifier, expiry) = parse_prefix(&buf[..PREFIX_LEN])?;
        let token = read_token(&buf[PREFIX_LEN..PREFIX_LEN + TOKEN_LEN]);
        let payload_len = read_payload_len(&buf[PREFIX_LEN + TOKEN_LEN..FRAME_HEADER_LEN])?;

        let total = FRAME_HEADER_LEN + payload_len;
        if buf.len() < total {
            return Ok(None);
        }

        let frame = Self {
            identifier,
            expiry,
            token,
            payload: buf[FRAME_HEADER_LEN..total].to_vec(),
        };
        Ok(Some((frame, total)))
    }

    /// Read one frame from a blocking reader.
    ///
    /// Returns `Ok(None)` on clean EOF before the first byte of a frame.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Self>, PushError> {
        let mut header = [0u8; FRAME_HEADER_LEN];

        // First byte separately so EOF between frames is not an error
        loop {
            match reader.read(&mut header[..1]) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        reader.read_exact(&mut header[1..])?;

        let (identifier, expiry) = parse_prefix(&header[..PREFIX_LEN])?;
        let token = read_token(&header[PREFIX_LEN..PREFIX_LEN + TOKEN_LEN]);
        let payload_len = read_payload_len(&header[PREFIX_LEN + TOKEN_LEN..])?;

        let mut payload = vec![0u8; payload_len];
        reader.read_exact(&mut payload)?;

        Ok(Some(Self {
            identifier,
            expiry,
            token,
            payload,
        }))
    }
}

fn parse_prefix(prefix: &[u8]) -> Result<(u32, u32), PushError> {
    if prefix[0] != COMMAND_ENHANCED {
        return Err(PushError::Protocol(format!(
            "unknown command byte {}",
            prefix[0]
        )));
    }
    let identifier = u32::from_be_bytes([prefix[1], prefix[2], prefix[3], prefix[4]]);
    let expiry = u32::from_be_bytes([prefix[5], prefix[6], prefix[7], prefix[8]]);
    let token_len = u16::from_be_bytes([prefix[9], prefix[10]]) as usize;
    if token_len != TOKEN_LEN {
        return Err(PushError::Protocol(format!(
            "token length {} (expected {})",
            token_len, TOKEN_LEN
        )));
    }
    Ok((identifier, expiry))
}

fn read_token(raw: &[u8]) -> DeviceToken {
    let mut bytes = [0u8; TOKEN_LEN];
    bytes.copy_from_slice(raw);
    DeviceToken::from_bytes(bytes)
}

fn read_payload_len(raw: &[u8]) -> Result<usize, PushError> {
    let len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    if len > MAX_PAYLOAD_LEN {
        return Err(PushError::Protocol(format!(
            "payload length {} exceeds {}",
            len, MAX_PAYLOAD_LEN
        )));
    }
    Ok(len)
}
