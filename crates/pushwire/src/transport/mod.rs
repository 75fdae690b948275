// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Gateway transport: TCP, optional proxy tunnel, TLS.

pub mod byte_stream;
pub mod connection_manager;
pub mod proxy;
pub mod tls;

pub use byte_stream::{BoxedByteStream, ByteStream};
pub use connection_manager::{ConnectionManager, Connector};
pub use tls::{TlsStream, TrustPolicy};
