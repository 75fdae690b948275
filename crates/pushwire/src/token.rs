// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Device tokens.
//!
//! A token is 32 opaque bytes written on the wire. Callers hand them around as
//! 64 hexadecimal characters; parsing is case-insensitive and rendering is
//! lowercase.

use std::fmt;
use std::str::FromStr;

use crate::error::PushError;

/// Binary token length.
pub const TOKEN_LEN: usize = 32;

/// Hex-encoded token length.
pub const TOKEN_HEX_LEN: usize = TOKEN_LEN * 2;

/// Validated 32-byte device token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceToken([u8; TOKEN_LEN]);

impl DeviceToken {
    /// Parse a 64-character hex token.
    pub fn parse(hex: &str) -> Result<Self, PushError> {
        let invalid = |reason| PushError::InvalidToken {
            token: hex.to_string(),
            reason,
        };

        if hex.len() != TOKEN_HEX_LEN {
            return Err(invalid("expected 64 hex characters"));
        }

        let mut bytes = [0u8; TOKEN_LEN];
        for (dst, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks_exact(2)) {
            let hi = hex_value(pair[0]).ok_or_else(|| invalid("non-hex character"))?;
            let lo = hex_value(pair[1]).ok_or_else(|| invalid("non-hex character"))?;
            *dst = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Wrap raw token bytes.
    pub const fn from_bytes(bytes: [u8; TOKEN_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8; TOKEN_LEN] {
        &self.0
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl FromStr for DeviceToken {
    type Err = PushError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceToken({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lower_and_upper() {
        let lower = "aa".repeat(32);
        let upper = "AA".repeat(32);
        let a = DeviceToken::parse(&lower).unwrap();
        let b = DeviceToken::parse(&upper).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), &[0xAA; 32]);
        assert_eq!(b.to_string(), lower);
    }

    #[test]
    fn test_parse_mixed_digits() {
        let hex = "0123456789abcdefABCDEF0123456789abcdef0123456789ABCDEF0123456789";
        let token: DeviceToken = hex.parse().unwrap();
        assert_eq!(token.as_bytes()[0], 0x01);
        assert_eq!(token.as_bytes()[7], 0xef);
        assert_eq!(token.to_hex(), hex.to_ascii_lowercase());
    }

    #[test]
    fn test_reject_wrong_length() {
        for len in [0, 2, 63, 65, 128] {
            let hex = "a".repeat(len);
            let err = DeviceToken::parse(&hex).unwrap_err();
            assert!(matches!(err, PushError::InvalidToken { .. }), "len {}", len);
        }
    }

    #[test]
    fn test_reject_non_hex() {
        let mut hex = "ab".repeat(32);
        hex.replace_range(10..11, "g");
        let err = DeviceToken::parse(&hex).unwrap_err();
        match err {
            PushError::InvalidToken { token, reason } => {
                assert_eq!(token, hex);
                assert_eq!(reason, "non-hex character");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reject_multibyte_utf8() {
        // 64 bytes but not ASCII hex
        let hex = format!("{}é", "a".repeat(62));
        assert_eq!(hex.len(), 64);
        assert!(DeviceToken::parse(&hex).is_err());
    }

    #[test]
    fn test_random_round_trip_through_hex() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..64 {
            let mut raw = [0u8; TOKEN_LEN];
            rng.fill(&mut raw);
            let token = DeviceToken::from_bytes(raw);
            assert_eq!(DeviceToken::parse(&token.to_hex()).unwrap(), token);
        }
    }
}
