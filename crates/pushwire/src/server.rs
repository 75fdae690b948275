// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server descriptors and credential providers.
//!
//! A [`ServerDescriptor`] names one gateway endpoint together with the
//! credentials used to authenticate against it and an optional HTTP proxy.
//! Descriptors are immutable; clone them freely.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pushwire::{CredentialFormat, CredentialMaterial, Environment, ServerDescriptor, StaticCredentials};
//!
//! let creds = Arc::new(StaticCredentials::new(CredentialMaterial::new(
//!     b"-----BEGIN CERTIFICATE-----...".to_vec(),
//!     CredentialFormat::Pem,
//! )));
//! let gateway = ServerDescriptor::notification(Environment::Sandbox, creds);
//! assert_eq!(gateway.port(), 2195);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::CredentialError;

// ============================================================================
// Gateway presets
// ============================================================================

/// Production notification gateway host.
pub const PRODUCTION_GATEWAY_HOST: &str = "gateway.push.apple.com";
/// Sandbox notification gateway host.
pub const SANDBOX_GATEWAY_HOST: &str = "gateway.sandbox.push.apple.com";
/// Notification gateway port.
pub const GATEWAY_PORT: u16 = 2195;

/// Production feedback host.
pub const PRODUCTION_FEEDBACK_HOST: &str = "feedback.push.apple.com";
/// Sandbox feedback host.
pub const SANDBOX_FEEDBACK_HOST: &str = "feedback.sandbox.push.apple.com";
/// Feedback port.
pub const FEEDBACK_PORT: u16 = 2196;

/// Gateway environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// Live devices.
    Production,
    /// Development builds.
    #[default]
    Sandbox,
}

impl Environment {
    /// Notification gateway host for this environment.
    pub fn gateway_host(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_GATEWAY_HOST,
            Self::Sandbox => SANDBOX_GATEWAY_HOST,
        }
    }

    /// Feedback host for this environment.
    pub fn feedback_host(self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_FEEDBACK_HOST,
            Self::Sandbox => SANDBOX_FEEDBACK_HOST,
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Container format of credential material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialFormat {
    /// PEM certificate chain followed (or preceded) by a PEM private key.
    Pem,
    /// PKCS#12 bundle, unlocked with the material password.
    Pkcs12,
    /// Java keystore. Not supported.
    Jks,
}

impl fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pem => write!(f, "PEM"),
            Self::Pkcs12 => write!(f, "PKCS#12"),
            Self::Jks => write!(f, "JKS"),
        }
    }
}

/// Raw credential bytes handed to the connection layer.
#[derive(Clone)]
pub struct CredentialMaterial {
    /// Encoded keystore bytes.
    pub bytes: Vec<u8>,
    /// Optional keystore password.
    pub password: Option<Zeroizing<String>>,
    /// Encoding of `bytes`.
    pub format: CredentialFormat,
}

impl CredentialMaterial {
    /// Material without a password.
    pub fn new(bytes: Vec<u8>, format: CredentialFormat) -> Self {
        Self {
            bytes,
            password: None,
            format,
        }
    }

    /// Attach a password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }
}

impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialMaterial")
            .field("bytes", &self.bytes.len())
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("format", &self.format)
            .finish()
    }
}

/// Source of credential material for a descriptor.
///
/// Implementations decide where keys live (memory, disk, a secret store).
pub trait CredentialProvider: Send + Sync {
    /// Return the material to authenticate against `server`.
    fn material_for(
        &self,
        server: &ServerDescriptor,
    ) -> Result<CredentialMaterial, CredentialError>;
}

/// Credentials held in memory.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    material: CredentialMaterial,
}

impl StaticCredentials {
    /// Wrap material already loaded by the caller.
    pub fn new(material: CredentialMaterial) -> Self {
        Self { material }
    }
}

impl CredentialProvider for StaticCredentials {
    fn material_for(
        &self,
        _server: &ServerDescriptor,
    ) -> Result<CredentialMaterial, CredentialError> {
        Ok(self.material.clone())
    }
}

/// Credentials read from a file each time they are requested.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    path: PathBuf,
    password: Option<Zeroizing<String>>,
    format: CredentialFormat,
}

impl FileCredentials {
    /// Read credentials of `format` from `path`.
    pub fn new(path: impl AsRef<Path>, format: CredentialFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            password: None,
            format,
        }
    }

    /// Attach a password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(Zeroizing::new(password.into()));
        self
    }

    /// Path the material is read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialProvider for FileCredentials {
    fn material_for(
        &self,
        _server: &ServerDescriptor,
    ) -> Result<CredentialMaterial, CredentialError> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            CredentialError::Unreadable(format!("{}: {}", self.path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(CredentialError::InvalidMaterial(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        Ok(CredentialMaterial {
            bytes,
            password: self.password.clone(),
            format: self.format,
        })
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// HTTP proxy used to tunnel the TLS connection (CONNECT method).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyConfig {
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
}

impl ProxyConfig {
    /// Create a proxy configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

// ============================================================================
// ServerDescriptor
// ============================================================================

/// One gateway endpoint plus the credentials and proxy used to reach it.
#[derive(Clone)]
pub struct ServerDescriptor {
    host: String,
    port: u16,
    credentials: Arc<dyn CredentialProvider>,
    proxy: Option<ProxyConfig>,
}

impl ServerDescriptor {
    /// Arbitrary endpoint.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            proxy: None,
        }
    }

    /// Notification gateway for `env`.
    pub fn notification(env: Environment, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::new(env.gateway_host(), GATEWAY_PORT, credentials)
    }

    /// Feedback service for `env`.
    pub fn feedback(env: Environment, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self::new(env.feedback_host(), FEEDBACK_PORT, credentials)
    }

    /// Route connections through an HTTP CONNECT proxy.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Gateway host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Gateway port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Proxy, if any.
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// Credential provider.
    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Fetch credential material for this descriptor.
    pub fn credential_material(&self) -> Result<CredentialMaterial, CredentialError> {
        self.credentials.material_for(self)
    }

    /// Identity of the credential provider; stable across clones of this descriptor.
    pub(crate) fn credentials_id(&self) -> usize {
        Arc::as_ptr(&self.credentials) as *const () as usize
    }
}

impl fmt::Debug for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)?;
        if let Some(proxy) = &self.proxy {
            write!(f, " via {}:{}", proxy.host, proxy.port)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
