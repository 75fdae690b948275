// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types shared by every pushwire component.
//!
//! Errors fall in two groups:
//! - per-frame errors ([`PushError::InvalidToken`], [`PushError::OversizedPayload`])
//!   reject one notification before any I/O happens;
//! - critical errors ([`PushError::Credential`], [`PushError::Transport`]) mean a
//!   connection could not be established or kept alive.
//!
//! `PushError` is `Clone` so the same error can be recorded in a
//! [`PushOutcome`](crate::PushOutcome) and surfaced again by
//! [`WorkerPool::wait_for_all`](crate::WorkerPool::wait_for_all).

use std::fmt;
use std::io;

use crate::server::CredentialFormat;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PushError>;

// ============================================================================
// Credential errors
// ============================================================================

/// Credential material could not be turned into a TLS client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Material could not be read (missing file, permission denied, ...).
    Unreadable(String),

    /// Material was read but does not hold a usable certificate/key pair.
    InvalidMaterial(String),

    /// The private key is protected and the password does not unlock it.
    InvalidPassword,

    /// Container format not handled by this client.
    UnsupportedFormat(CredentialFormat),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable(s) => write!(f, "credential unreadable: {}", s),
            Self::InvalidMaterial(s) => write!(f, "invalid credential material: {}", s),
            Self::InvalidPassword => write!(f, "invalid credential password"),
            Self::UnsupportedFormat(format) => {
                write!(f, "unsupported credential format: {}", format)
            }
        }
    }
}

impl std::error::Error for CredentialError {}

// ============================================================================
// PushError
// ============================================================================

/// Top-level error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// Credential problem. Never retried.
    Credential(CredentialError),

    /// Network, proxy tunnel or TLS failure.
    Transport {
        /// I/O error kind reported by the OS or TLS layer.
        kind: io::ErrorKind,
        /// Human readable detail.
        message: String,
    },

    /// Device token is not 64 hex characters.
    InvalidToken {
        /// Token as supplied by the caller.
        token: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// Payload exceeds the protocol maximum.
    OversizedPayload {
        /// Actual payload length in bytes.
        size: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Malformed frame or feedback data.
    Protocol(String),

    /// Operation requires an open connection.
    NotConnected,

    /// Operation not valid in the current state or mode.
    InvalidState(&'static str),

    /// Rejected configuration.
    Config(String),

    /// Internal failure (thread spawn, poisoned state).
    Internal(String),
}

impl PushError {
    /// Build a transport error with a custom message.
    pub fn transport(kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self::Transport {
            kind,
            message: message.into(),
        }
    }

    /// True for errors that stop a worker: credential and transport failures.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Credential(_) | Self::Transport { .. })
    }

    /// True for errors that only reject one notification.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. } | Self::OversizedPayload { .. }
        )
    }

    /// True when the engine may reconnect and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credential(e) => write!(f, "credential error: {}", e),
            Self::Transport { kind, message } => {
                write!(f, "transport error ({:?}): {}", kind, message)
            }
            Self::InvalidToken { token, reason } => {
                write!(f, "invalid device token '{}': {}", token, reason)
            }
            Self::OversizedPayload { size, max } => {
                write!(f, "payload of {} bytes exceeds maximum of {}", size, max)
            }
            Self::Protocol(s) => write!(f, "protocol error: {}", s),
            Self::NotConnected => write!(f, "not connected"),
            Self::InvalidState(s) => write!(f, "invalid state: {}", s),
            Self::Config(s) => write!(f, "configuration error: {}", s),
            Self::Internal(s) => write!(f, "internal error: {}", s),
        }
    }
}

impl std::error::Error for PushError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Credential(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PushError {
    fn from(e: io::Error) -> Self {
        Self::Transport {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<CredentialError> for PushError {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

// ============================================================================
// Tests
// ============================================================================
