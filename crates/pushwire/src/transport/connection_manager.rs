// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection manager for gateway connections.
//!
//! Turns a [`ServerDescriptor`] into an authenticated, ready-to-use stream:
//!
//! ```text
//! descriptor --> TLS context (cached per descriptor)
//!            --> TCP connect (direct, or to the proxy + CONNECT tunnel)
//!            --> TLS handshake --> BoxedByteStream
//! ```
//!
//! The manager never retries; retry policy belongs to the
//! [`TransmissionEngine`](crate::TransmissionEngine).

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustls::ClientConfig;
use socket2::{Domain, Protocol, Socket, TcpKeepalive, Type};

use super::byte_stream::{BoxedByteStream, ByteStream};
use super::proxy::open_tunnel;
use super::tls::{build_client_config, TlsStream};
use crate::config::ConnectionConfig;
use crate::error::PushError;
use crate::metrics::PushMetrics;
use crate::server::{CredentialProvider, ServerDescriptor};

// ============================================================================
// Connector
// ============================================================================

/// Source of ready-to-use streams.
///
/// [`ConnectionManager`] is the production implementation; engines and the
/// feedback service depend only on this trait.
pub trait Connector: Send + Sync {
    /// Open a new authenticated stream to `server`.
    fn connect(&self, server: &ServerDescriptor) -> Result<BoxedByteStream, PushError>;
}

impl<C: Connector + ?Sized> Connector for Arc<C> {
    fn connect(&self, server: &ServerDescriptor) -> Result<BoxedByteStream, PushError> {
        (**self).connect(server)
    }
}

// ============================================================================
// TLS context cache
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ContextKey {
    host: String,
    port: u16,
    credentials: usize,
}

impl ContextKey {
    fn of(server: &ServerDescriptor) -> Self {
        Self {
            host: server.host().to_string(),
            port: server.port(),
            credentials: server.credentials_id(),
        }
    }
}

/// The weak handle keeps the provider allocation, so its address in the key
/// cannot be reused while the entry exists.
struct CachedContext {
    credentials: Weak<dyn CredentialProvider>,
    config: Arc<ClientConfig>,
}

impl CachedContext {
    fn is_live(&self) -> bool {
        self.credentials.strong_count() > 0
    }
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Opens TLS connections to gateways.
pub struct ConnectionManager {
    config: ConnectionConfig,
    contexts: Mutex<HashMap<ContextKey, CachedContext>>,
    metrics: Option<Arc<PushMetrics>>,
}

impl ConnectionManager {
    /// Create a manager; fails on invalid configuration.
    pub fn new(config: ConnectionConfig) -> Result<Self, PushError> {
        config
            .validate()
            .map_err(|e| PushError::Config(e.to_string()))?;
        Ok(Self {
            config,
            contexts: Mutex::new(HashMap::new()),
            metrics: None,
        })
    }

    /// Record connection events in `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<PushMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Number of cached TLS contexts.
    pub fn cached_contexts(&self) -> usize {
        self.contexts.lock().len()
    }

    /// Drop cached TLS contexts (e.g. after rotating credentials).
    pub fn clear_cache(&self) {
        self.contexts.lock().clear();
    }

    /// TLS client context for `server`, built on first use.
    ///
    /// Contexts are keyed by host, port and credential provider. Credentials
    /// are loaded without holding the cache lock. Entries whose provider has
    /// been dropped are pruned on the next insert.
    pub fn tls_context(&self, server: &ServerDescriptor) -> Result<Arc<ClientConfig>, PushError> {
        let key = ContextKey::of(server);
        if let Some(cached) = self.contexts.lock().get(&key) {
            return Ok(Arc::clone(&cached.config));
        }

        let material = server.credential_material()?;
        let config = build_client_config(&material, &self.config.trust)?;
        log::debug!(
            "[conn] built TLS context for {} ({} credentials)",
            server,
            material.format
        );

        let mut contexts = self.contexts.lock();
        contexts.retain(|_, cached| cached.is_live());
        // A concurrent build for the same key may have landed first
        let cached = contexts.entry(key).or_insert_with(|| CachedContext {
            credentials: Arc::downgrade(server.credentials()),
            config,
        });
        Ok(Arc::clone(&cached.config))
    }

    fn establish(&self, server: &ServerDescriptor) -> Result<BoxedByteStream, PushError> {
        let tls_config = self.tls_context(server)?;

        let tcp = match server.proxy() {
            Some(proxy) => {
                let mut tcp = self.open_tcp(&proxy.host, proxy.port)?;
                tcp.set_read_timeout(self.config.read_timeout)?;
                open_tunnel(&mut tcp, server.host(), server.port())?;
                tcp
            }
            None => self.open_tcp(server.host(), server.port())?,
        };
        tcp.set_read_timeout(self.config.read_timeout)?;
        tcp.set_write_timeout(self.config.write_timeout)?;

        let stream = TlsStream::connect(tls_config, server.host(), tcp)?;
        Ok(Box::new(stream))
    }

    /// Connect to the first reachable address of `host:port`.
    fn open_tcp(&self, host: &str, port: u16) -> Result<TcpStream, PushError> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(PushError::transport(
                io::ErrorKind::NotFound,
                format!("no addresses for {}:{}", host, port),
            ));
        }

        let mut last_err = None;
        for addr in addrs {
            match self.connect_addr(addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::debug!("[conn] connect to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .map(PushError::from)
            .unwrap_or_else(|| PushError::transport(io::ErrorKind::Other, "connect failed")))
    }

    fn connect_addr(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        if self.config.keepalive {
            let keepalive = TcpKeepalive::new().with_time(self.config.keepalive_interval);
            socket.set_tcp_keepalive(&keepalive)?;
        }
        socket.set_nodelay(self.config.nodelay)?;
        socket.connect_timeout(&addr.into(), self.config.connect_timeout)?;
        Ok(socket.into())
    }
}

impl Connector for ConnectionManager {
    fn connect(&self, server: &ServerDescriptor) -> Result<BoxedByteStream, PushError> {
        match self.establish(server) {
            Ok(stream) => {
                if let Some(m) = &self.metrics {
                    m.record_connection_established();
                }
                log::debug!(
                    "[conn] connected to {} (peer {:?}, tls={})",
                    server,
                    stream.peer_addr().ok(),
                    stream.is_tls()
                );
                Ok(stream)
            }
            Err(e) => {
                if let Some(m) = &self.metrics {
                    m.record_connection_failed();
                }
                log::warn!("[conn] connection to {} failed: {}", server, e);
                Err(e)
            }
        }
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("cached_contexts", &self.cached_contexts())
            .finish()
    }
}

// ============================================================================
// Test mock connector
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
