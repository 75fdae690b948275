// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ByteStream trait for TCP and TLS abstraction.
//!
//! Engines and the feedback reader only see a `ByteStream`, so they work the
//! same over:
//! - TLS ([`TlsStream`](super::tls::TlsStream))
//! - in-memory mock streams in tests
//!
//! All implementations are blocking. Read and write timeouts are set on the
//! socket before the handshake.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr};

/// Abstraction over byte-oriented, blocking streams.
pub trait ByteStream: Read + Write + Send {
    /// Shutdown the stream. TLS streams send close_notify first.
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()>;

    /// Get the peer address of this stream.
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Check if this is a TLS stream (for logging/debugging).
    fn is_tls(&self) -> bool {
        false
    }
}

// ============================================================================
// Boxed ByteStream
// ============================================================================

/// Type alias for a boxed ByteStream.
pub type BoxedByteStream = Box<dyn ByteStream>;

impl ByteStream for BoxedByteStream {
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        (**self).shutdown(how)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        (**self).peer_addr()
    }

    fn is_tls(&self) -> bool {
        (**self).is_tls()
    }
}

// ============================================================================
// Test mock stream
// ============================================================================


// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::mock::MockStream;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_byte_stream_is_object_safe() {
        let stream: BoxedByteStream = Box::new(MockStream::new());
        assert!(!stream.is_tls());
        assert!(stream.peer_addr().is_ok());
    }

    #[test]
    fn test_mock_write_capture_survives_boxing() {
        let mock = MockStream::new();
        let written = mock.written();
        let mut boxed: BoxedByteStream = Box::new(mock);

        boxed.write_all(b"hello").unwrap();
        boxed.flush().unwrap();
        assert_eq!(&*written.lock(), b"hello");
    }

    #[test]
    fn test_mock_error_injection_is_one_shot() {
        let mut stream = MockStream::failing_write(io::ErrorKind::BrokenPipe);
        assert_eq!(
            stream.write(b"x").unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert!(stream.write(b"x").is_ok());

        stream.inject_flush_error(io::ErrorKind::ConnectionReset);
        assert!(stream.flush().is_err());
        assert!(stream.flush().is_ok());
    }

    #[test]
    fn test_mock_read_then_eof() {
        let mut stream = MockStream::new().with_read_data(b"abc");
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_mock_shutdown_blocks_writes() {
        let mut stream = MockStream::new();
        let flag = stream.shutdown_flag();
        ByteStream::shutdown(&mut stream, Shutdown::Both).unwrap();
        assert!(flag.load(Ordering::SeqCst));
        assert!(stream.write(b"late").is_err());
    }
}
