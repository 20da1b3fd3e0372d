//! Configuration management module
//!
//! Everything the registry client needs is resolved up front into a
//! [`RegistryConfig`] value. The library never reads the environment itself.

use crate::error::ConfigError;
use crate::registry::scope::Scope;
use crate::tls::TlsMode;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_AUTH_SERVICE: &str = "Docker registry";
pub const DEFAULT_AUTH_PORT: u16 = 5001;

/// Username and password presented to the authorization endpoint only.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl AuthConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        Ok(())
    }

    /// Value for an `Authorization: Basic ...` header.
    pub fn basic_authorization(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {}", encoded)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transport timeouts applied to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            request: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect.is_zero() {
            return Err(ConfigError::ZeroTimeout("connect"));
        }
        if self.request.is_zero() {
            return Err(ConfigError::ZeroTimeout("request"));
        }
        Ok(())
    }
}

/// Registry configuration
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base of the v2 API, always ending in `/`.
    pub registry_url: Url,
    /// Token issuing endpoint.
    pub auth_url: Url,
    pub service: String,
    pub catalog_scope: Scope,
    pub credentials: AuthConfig,
    pub tls: TlsMode,
    pub timeouts: Timeouts,
}

impl RegistryConfig {
    pub fn new(
        registry_url: &str,
        auth_url: &str,
        credentials: AuthConfig,
        tls: TlsMode,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            registry_url: parse_base(registry_url, true)?,
            auth_url: parse_base(auth_url, false)?,
            service: DEFAULT_AUTH_SERVICE.to_string(),
            catalog_scope: Scope::catalog(),
            credentials,
            tls,
            timeouts: Timeouts::default(),
        })
    }

    /// Conventional single-host deployment: the registry at
    /// `https://<host>/v2/` and its token service at `https://<host>:5001/auth`.
    pub fn for_host(host: &str, credentials: AuthConfig, tls: TlsMode) -> Result<Self, ConfigError> {
        if host.is_empty() {
            return Err(ConfigError::MissingField("host"));
        }
        let registry_url = parse_base(&format!("https://{}/v2/", host), true)?;

        let mut auth_url = registry_url.clone();
        auth_url.set_path("/auth");
        auth_url
            .set_port(Some(DEFAULT_AUTH_PORT))
            .map_err(|_| ConfigError::InvalidEndpoint {
                url: auth_url.to_string(),
                reason: "cannot carry a port".to_string(),
            })?;

        Ok(Self {
            registry_url,
            auth_url,
            service: DEFAULT_AUTH_SERVICE.to_string(),
            catalog_scope: Scope::catalog(),
            credentials,
            tls,
            timeouts: Timeouts::default(),
        })
    }

    pub fn with_auth_url(mut self, auth_url: &str) -> Result<Self, ConfigError> {
        self.auth_url = parse_base(auth_url, false)?;
        Ok(self)
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_catalog_scope(mut self, scope: Scope) -> Self {
        self.catalog_scope = scope;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.is_empty() {
            return Err(ConfigError::MissingField("service"));
        }
        self.credentials.validate()?;
        self.timeouts.validate()
    }
}

/// Parse an absolute http(s) URL. Registry bases get a trailing slash so that
/// relative joins append instead of replacing the last segment.
fn parse_base(raw: &str, directory: bool) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        url: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not contain a query or fragment".to_string()));
    }
    if directory && !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> AuthConfig {
        AuthConfig::new("admin", "s3cret")
    }

    #[test]
    fn for_host_uses_conventional_endpoints() {
        let config = RegistryConfig::for_host("registry.local", creds(), TlsMode::Insecure).unwrap();
        assert_eq!(config.registry_url.as_str(), "https://registry.local/v2/");
        assert_eq!(config.auth_url.as_str(), "https://registry.local:5001/auth");
        assert_eq!(config.service, "Docker registry");
        assert_eq!(config.catalog_scope.to_string(), "registry:catalog:*");
    }

    #[test]
    fn for_host_with_port_keeps_port_for_registry_only() {
        let config = RegistryConfig::for_host("registry.local:8443", creds(), TlsMode::Insecure).unwrap();
        assert_eq!(config.registry_url.as_str(), "https://registry.local:8443/v2/");
        assert_eq!(config.auth_url.as_str(), "https://registry.local:5001/auth");
    }

    #[test]
    fn for_host_rejects_empty_host() {
        let err = RegistryConfig::for_host("", creds(), TlsMode::Insecure).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("host")));
    }

    #[test]
    fn registry_base_gains_trailing_slash() {
        let config = RegistryConfig::new(
            "http://127.0.0.1:5000/v2",
            "http://127.0.0.1:5001/auth",
            creds(),
            TlsMode::Insecure,
        )
        .unwrap();
        assert_eq!(config.registry_url.as_str(), "http://127.0.0.1:5000/v2/");
        assert_eq!(config.auth_url.as_str(), "http://127.0.0.1:5001/auth");
    }

    #[test]
    fn rejects_non_http_endpoints() {
        let err = RegistryConfig::new("ftp://x/v2/", "https://x/auth", creds(), TlsMode::Insecure)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));

        let err = RegistryConfig::new("https://x/v2/", "not a url", creds(), TlsMode::Insecure)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn validate_requires_username_service_and_timeouts() {
        let config = RegistryConfig::for_host("r", AuthConfig::new("", "pw"), TlsMode::Insecure).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingField("username"))));

        let config = RegistryConfig::for_host("r", creds(), TlsMode::Insecure)
            .unwrap()
            .with_service("");
        assert!(matches!(config.validate(), Err(ConfigError::MissingField("service"))));

        let config = RegistryConfig::for_host("r", creds(), TlsMode::Insecure)
            .unwrap()
            .with_timeouts(Timeouts {
                connect: Duration::ZERO,
                request: Duration::from_secs(1),
            });
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout("connect"))));
    }

    #[test]
    fn basic_authorization_is_base64_of_user_and_password() {
        // "admin:s3cret"
        assert_eq!(creds().basic_authorization(), "Basic YWRtaW46czNjcmV0");
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", creds());
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("s3cret"));
    }
}
