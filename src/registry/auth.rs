//! Authentication module for Docker registry access
//!
//! Tokens are requested from the registry's separate token service with Basic
//! credentials and a scope, then presented to the registry as a Bearer
//! credential. No token outlives the call it was requested for.

use crate::config::{AuthConfig, RegistryConfig};
use crate::error::AuthError;
use crate::registry::models::{Token, TokenResponse};
use crate::registry::scope::Scope;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use tracing::debug;
use url::Url;

/// Something that can hand out a bearer token for a scope.
///
/// The registry client only depends on this trait, so a caching layer can
/// wrap [`TokenAuthenticator`] without the client noticing.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn authenticate(&self, client: &Client, scope: &Scope) -> Result<Token, AuthError>;
}

/// Fetches tokens from the authorization endpoint.
#[derive(Debug, Clone)]
pub struct TokenAuthenticator {
    auth_url: Url,
    service: String,
    credentials: AuthConfig,
}

impl TokenAuthenticator {
    pub fn new(auth_url: Url, service: impl Into<String>, credentials: AuthConfig) -> Self {
        Self {
            auth_url,
            service: service.into(),
            credentials,
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(
            config.auth_url.clone(),
            config.service.clone(),
            config.credentials.clone(),
        )
    }
}

#[async_trait]
impl TokenSource for TokenAuthenticator {
    async fn authenticate(&self, client: &Client, scope: &Scope) -> Result<Token, AuthError> {
        debug!(endpoint = %self.auth_url, service = %self.service, scope = %scope, "requesting token");

        let scope = scope.to_string();
        let response = client
            .get(self.auth_url.clone())
            .query(&[("service", self.service.as_str()), ("scope", scope.as_str())])
            .header(AUTHORIZATION, self.credentials.basic_authorization())
            .send()
            .await
            .map_err(AuthError::Unreachable)?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(%status, "token request rejected");
            return Err(AuthError::Rejected { status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::MalformedResponse(format!("failed to read body: {}", e)))?;

        let parsed: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        debug!(length = parsed.token.len(), "token obtained");
        Ok(Token::new(parsed.token))
    }
}
