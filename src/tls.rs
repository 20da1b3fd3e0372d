//! TLS trust configuration and HTTP client construction
//!
//! A [`TlsMode`] is chosen once from configuration. [`build_client`] turns it
//! into a `reqwest::Client` without touching the network, so the registry
//! client can build a fresh one for every call.

use crate::config::Timeouts;
use crate::error::ConfigError;
use reqwest::{Certificate, Client};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Which server certificates a client accepts.
///
/// There is deliberately no `Default`: insecure mode must be asked for.
#[derive(Clone, Debug)]
pub enum TlsMode {
    /// Trust exactly the certificates in the bundle, ignoring the system store.
    Verified(CaBundle),
    /// Perform no server certificate validation.
    Insecure,
}

impl TlsMode {
    /// Read and parse a PEM CA bundle from disk.
    pub fn verified_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        CaBundle::from_file(path).map(TlsMode::Verified)
    }

    pub fn is_insecure(&self) -> bool {
        matches!(self, TlsMode::Insecure)
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsMode::Verified(bundle) => write!(f, "verified ({})", bundle.source.display()),
            TlsMode::Insecure => write!(f, "insecure (certificate validation disabled)"),
        }
    }
}

/// Parsed CA certificates used as the only trust anchors.
#[derive(Clone, Debug)]
pub struct CaBundle {
    source: PathBuf,
    certificates: Vec<Certificate>,
}

impl CaBundle {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| ConfigError::UnreadableCert {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(path.to_path_buf(), &pem)
    }

    /// Parse an in-memory PEM bundle. `label` is only used in error messages.
    pub fn from_pem(label: impl Into<PathBuf>, pem: &[u8]) -> Result<Self, ConfigError> {
        Self::parse(label.into(), pem)
    }

    fn parse(source: PathBuf, pem: &[u8]) -> Result<Self, ConfigError> {
        let certificates =
            Certificate::from_pem_bundle(pem).map_err(|e| ConfigError::UnreadableCert {
                path: source.clone(),
                reason: e.to_string(),
            })?;

        if certificates.is_empty() {
            return Err(ConfigError::UnreadableCert {
                path: source,
                reason: "no PEM certificates found".to_string(),
            });
        }

        debug!(path = %source.display(), count = certificates.len(), "loaded CA bundle");
        Ok(Self {
            source,
            certificates,
        })
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Build an HTTP client for the given trust policy with timeouts applied.
pub fn build_client(mode: &TlsMode, timeouts: &Timeouts) -> Result<Client, ConfigError> {
    let builder = Client::builder()
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.request);

    let builder = match mode {
        TlsMode::Verified(bundle) => bundle
            .certificates
            .iter()
            .cloned()
            .fold(builder.tls_built_in_root_certs(false), |b, cert| {
                b.add_root_certificate(cert)
            }),
        TlsMode::Insecure => {
            warn!("TLS certificate validation is DISABLED; registry traffic can be intercepted");
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
        }
    };

    builder.build().map_err(ConfigError::ClientBuild)
}
