// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Local TLS gateway, feedback server and CONNECT proxy for integration tests.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pushwire::{
    CredentialFormat, CredentialMaterial, NotificationFrame, ServerDescriptor, StaticCredentials,
};
use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};

/// Client identity (certificate + key) as one PEM blob.
pub fn client_identity() -> Vec<u8> {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["pushwire-client".to_string()]).unwrap();
    let mut pem = cert.pem().into_bytes();
    pem.extend_from_slice(key_pair.serialize_pem().as_bytes());
    pem
}

/// Descriptor for a local server using a fresh client identity.
pub fn descriptor(host: &str, addr: SocketAddr) -> ServerDescriptor {
    ServerDescriptor::new(
        host,
        addr.port(),
        Arc::new(StaticCredentials::new(CredentialMaterial::new(
            client_identity(),
            CredentialFormat::Pem,
        ))),
    )
}

/// Server identity signed by a throwaway CA.
pub struct ServerIdentity {
    pub ca_pem: String,
    pub config: Arc<ServerConfig>,
}

impl ServerIdentity {
    pub fn new() -> Self {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .signed_by(&key, &ca, &ca_key)
            .unwrap();

        let key_der: PrivateKeyDer<'static> =
            PrivatePkcs8KeyDer::from(key.serialize_der()).into();
        let chain: Vec<CertificateDer<'static>> = vec![cert.der().clone()];
        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain, key_der)
            .unwrap();
        // Clients never read after the handshake; unread tickets would turn
        // their close into a reset
        config.send_tls13_tickets = 0;

        Self {
            ca_pem: ca.pem(),
            config: Arc::new(config),
        }
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let end = Instant::now() + timeout;
    while Instant::now() < end {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

// ============================================================================
// Gateway
// ============================================================================

/// TLS server decoding notification frames from every connection.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub ca_pem: String,
    frames: Arc<Mutex<Vec<NotificationFrame>>>,
    connections: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl TestGateway {
    pub fn start() -> Self {
        let identity = ServerIdentity::new();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));

        let config = identity.config.clone();
        let (f, c, d) = (frames.clone(), connections.clone(), closed.clone());
        thread::spawn(move || {
            for tcp in listener.incoming().flatten() {
                c.fetch_add(1, Ordering::SeqCst);
                let (config, frames, closed) = (config.clone(), f.clone(), d.clone());
                thread::spawn(move || {
                    serve_gateway(config, tcp, &frames);
                    closed.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            addr,
            ca_pem: identity.ca_pem,
            frames,
            connections,
            closed,
        }
    }

    pub fn frames(&self) -> Vec<NotificationFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

fn serve_gateway(
    config: Arc<ServerConfig>,
    tcp: TcpStream,
    frames: &Mutex<Vec<NotificationFrame>>,
) {
    let Ok(conn) = ServerConnection::new(config) else {
        return;
    };
    let mut tls = StreamOwned::new(conn, tcp);
    // Ends on EOF, close_notify or a dropped socket
    while let Ok(Some(frame)) = NotificationFrame::read_from(&mut tls) {
        frames.lock().unwrap().push(frame);
    }
}

// ============================================================================
// Feedback server
// ============================================================================

/// TLS server that sends its pending tuples once, then forgets them.
pub struct TestFeedbackServer {
    pub addr: SocketAddr,
    pending: Arc<Mutex<Vec<u8>>>,
}

impl TestFeedbackServer {
    pub fn start(tuples: Vec<u8>) -> Self {
        let identity = ServerIdentity::new();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let pending = Arc::new(Mutex::new(tuples));

        let config = identity.config.clone();
        let list = pending.clone();
        thread::spawn(move || {
            for tcp in listener.incoming().flatten() {
                let bytes = std::mem::take(&mut *list.lock().unwrap());
                let _ = serve_feedback(config.clone(), tcp, &bytes);
            }
        });

        Self { addr, pending }
    }

    /// Queue more tuples for the next connection.
    pub fn push(&self, bytes: &[u8]) {
        self.pending.lock().unwrap().extend_from_slice(bytes);
    }
}

fn serve_feedback(config: Arc<ServerConfig>, tcp: TcpStream, bytes: &[u8]) -> io::Result<()> {
    let conn = ServerConnection::new(config).map_err(io::Error::other)?;
    let mut tls = StreamOwned::new(conn, tcp);
    while tls.conn.is_handshaking() {
        tls.conn.complete_io(&mut tls.sock)?;
    }
    tls.write_all(bytes)?;
    tls.conn.send_close_notify();
    tls.flush()?;
    while tls.conn.wants_write() {
        tls.conn.write_tls(&mut tls.sock)?;
    }
    tls.sock.shutdown(Shutdown::Write)?;
    // Wait for the client to hang up
    io::copy(&mut tls.sock, &mut io::sink())?;
    Ok(())
}

// ============================================================================
// CONNECT proxy
// ============================================================================

/// Minimal HTTP CONNECT proxy that tunnels to whatever target is asked for.
pub struct TestProxy {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestProxy {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        thread::spawn(move || {
            for client in listener.incoming().flatten() {
                let log = log.clone();
                thread::spawn(move || {
                    let _ = tunnel(client, &log);
                });
            }
        });

        Self { addr, requests }
    }

    /// Request lines seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn tunnel(mut client: TcpStream, log: &Mutex<Vec<String>>) -> io::Result<()> {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if client.read(&mut byte)? == 0 {
            return Ok(());
        }
        head.push(byte[0]);
    }
    let head = String::from_utf8_lossy(&head).into_owned();
    let request_line = head.lines().next().unwrap_or_default().to_string();
    log.lock().unwrap().push(request_line.clone());

    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();
    let upstream = TcpStream::connect(target)?;
    client.write_all(b"HTTP/1.0 200 Connection established\r\n\r\n")?;

    let (mut c_read, mut u_write) = (client.try_clone()?, upstream.try_clone()?);
    let forward = thread::spawn(move || {
        let _ = io::copy(&mut c_read, &mut u_write);
        let _ = u_write.shutdown(Shutdown::Write);
    });
    let (mut u_read, mut c_write) = (upstream, client);
    let _ = io::copy(&mut u_read, &mut c_write);
    let _ = c_write.shutdown(Shutdown::Write);
    let _ = forward.join();
    Ok(())
}
