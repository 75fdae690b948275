// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TLS client side of gateway connections.
//!
//! Builds a rustls `ClientConfig` from PEM or PKCS#12 credential material and
//! wraps the resulting connection in a [`TlsStream`] that implements [`ByteStream`].
//!
//! # Trust
//!
//! Server certificates are checked according to [`TrustPolicy`]:
//! - `WebPkiRoots` (default) validates against the bundled Mozilla roots
//! - `PinnedRoots` validates against caller-supplied PEM roots
//! - `AcceptAnyServer` skips validation entirely (testing only)

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;

use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use super::byte_stream::ByteStream;
use crate::error::{CredentialError, PushError};
use crate::server::{CredentialFormat, CredentialMaterial};

// ============================================================================
// Trust policy
// ============================================================================

/// How the server certificate chain is validated.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Standard validation against the webpki root set.
    #[default]
    WebPkiRoots,

    /// Standard validation against these PEM-encoded roots only.
    PinnedRoots(Vec<u8>),

    /// Accept any certificate the server presents.
    ///
    /// Leaves the connection open to interception. Never use against a
    /// production gateway.
    AcceptAnyServer,
}

impl fmt::Debug for TrustPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebPkiRoots => write!(f, "WebPkiRoots"),
            Self::PinnedRoots(pem) => write!(f, "PinnedRoots({} bytes)", pem.len()),
            Self::AcceptAnyServer => write!(f, "AcceptAnyServer"),
        }
    }
}

// ============================================================================
// Client configuration
// ============================================================================

/// Build a client configuration presenting `material` as client identity.
pub fn build_client_config(
    material: &CredentialMaterial,
    trust: &TrustPolicy,
) -> Result<Arc<ClientConfig>, PushError> {
    let (certs, key) = load_identity(material)?;

    let builder = match trust {
        TrustPolicy::WebPkiRoots => {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            ClientConfig::builder().with_root_certificates(roots)
        }
        TrustPolicy::PinnedRoots(pem) => {
            ClientConfig::builder().with_root_certificates(pinned_roots(pem)?)
        }
        TrustPolicy::AcceptAnyServer => {
            log::warn!("[tls] server certificate validation disabled");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
        }
    };

    let config = builder
        .with_client_auth_cert(certs, key)
        .map_err(|e| CredentialError::InvalidMaterial(e.to_string()))?;

    Ok(Arc::new(config))
}

type Identity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

fn load_identity(material: &CredentialMaterial) -> Result<Identity, CredentialError> {
    match material.format {
        CredentialFormat::Pem => load_pem_identity(&material.bytes),
        CredentialFormat::Pkcs12 => {
            let password = material.password.as_deref().map_or("", String::as_str);
            load_pkcs12_identity(&material.bytes, password)
        }
        CredentialFormat::Jks => Err(CredentialError::UnsupportedFormat(material.format)),
    }
}

/// Parse a PEM certificate chain and private key.
fn load_pem_identity(pem: &[u8]) -> Result<Identity, CredentialError> {
    let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CredentialError::InvalidMaterial(format!("certificate: {:?}", e)))?;

    if certs.is_empty() {
        return Err(CredentialError::InvalidMaterial(
            "no certificates found in PEM data".into(),
        ));
    }

    if contains(pem, b"ENCRYPTED PRIVATE KEY") {
        return Err(CredentialError::InvalidMaterial(
            "encrypted private keys are not supported".into(),
        ));
    }

    let key = PrivateKeyDer::from_pem_slice(pem)
        .map_err(|e| CredentialError::InvalidMaterial(format!("private key: {:?}", e)))?;

    Ok((certs, key))
}

/// Unlock a PKCS#12 bundle. The MAC check tells a wrong password apart from
/// corrupt data.
fn load_pkcs12_identity(der: &[u8], password: &str) -> Result<Identity, CredentialError> {
    let pfx = p12::PFX::parse(der)
        .map_err(|e| CredentialError::InvalidMaterial(format!("PKCS#12: {:?}", e)))?;
    if !pfx.verify_mac(password) {
        return Err(CredentialError::InvalidPassword);
    }

    let certs: Vec<CertificateDer<'static>> = pfx
        .cert_x509_bags(password)
        .map_err(|e| CredentialError::InvalidMaterial(format!("PKCS#12 certificates: {:?}", e)))?
        .into_iter()
        .map(CertificateDer::from)
        .collect();
    if certs.is_empty() {
        return Err(CredentialError::InvalidMaterial(
            "no certificates found in PKCS#12 data".into(),
        ));
    }

    let key = pfx
        .key_bags(password)
        .map_err(|e| CredentialError::InvalidMaterial(format!("PKCS#12 private key: {:?}", e)))?
        .into_iter()
        .next()
        .ok_or_else(|| {
            CredentialError::InvalidMaterial("no private key found in PKCS#12 data".into())
        })?;

    Ok((certs, PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key))))
}

fn pinned_roots(pem: &[u8]) -> Result<RootCertStore, PushError> {
    let mut roots = RootCertStore::empty();
    for cert in CertificateDer::pem_slice_iter(pem) {
        let cert = cert.map_err(|e| PushError::Config(format!("pinned root: {:?}", e)))?;
        roots
            .add(cert)
            .map_err(|e| PushError::Config(format!("pinned root: {}", e)))?;
    }
    if roots.is_empty() {
        return Err(PushError::Config("no pinned root certificates".into()));
    }
    Ok(roots)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ============================================================================
// No-verification certificate verifier (dangerous, for testing only)
// ============================================================================

#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}

// ============================================================================
// TLS Stream
// ============================================================================

/// A TLS-encrypted TCP stream (client side, blocking).
pub struct TlsStream {
    inner: StreamOwned<ClientConnection, TcpStream>,
}

impl TlsStream {
    /// Run the handshake over an already connected (possibly tunnelled) socket.
    ///
    /// `server_name` is used for SNI and certificate verification.
    pub fn connect(
        config: Arc<ClientConfig>,
        server_name: &str,
        mut tcp_stream: TcpStream,
    ) -> io::Result<Self> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let mut conn = ClientConnection::new(config, name).map_err(io::Error::other)?;

        while conn.is_handshaking() {
            conn.complete_io(&mut tcp_stream)?;
        }

        log::debug!(
            "[tls] handshake complete with {} ({:?})",
            server_name,
            conn.protocol_version()
        );

        Ok(Self {
            inner: StreamOwned::new(conn, tcp_stream),
        })
    }
}

impl Read for TlsStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for TlsStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ByteStream for TlsStream {
    fn shutdown(&mut self, how: Shutdown) -> io::Result<()> {
        // Send TLS close_notify; the peer may already be gone
        self.inner.conn.send_close_notify();
        while self.inner.conn.wants_write() {
            if self.inner.conn.write_tls(&mut self.inner.sock).is_err() {
                break;
            }
        }
        self.inner.sock.shutdown(how)
    }

    fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.inner.sock.peer_addr()
    }

    fn is_tls(&self) -> bool {
        true
    }
}

impl fmt::Debug for TlsStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsStream")
            .field("peer_addr", &self.inner.sock.peer_addr().ok())
            .field("protocol_version", &self.inner.conn.protocol_version())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
