//! Error types for registry browsing
//!
//! Three layers mirror the request flow: [`ConfigError`] is raised while the
//! client is assembled at startup, [`AuthError`] by the token round trip, and
//! [`ApiError`] is the single error a caller of the registry client observes.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// Invalid or unreadable configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CA certificate bundle {} could not be used: {reason}", path.display())]
    UnreadableCert { path: PathBuf, reason: String },

    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("missing required configuration value: {0}")]
    MissingField(&'static str),

    #[error("timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("failed to construct HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// A scope that cannot be sent to the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("scope {0} must not be empty")]
    EmptyComponent(&'static str),

    #[error("scope '{0}' is not of the form <type>:<name>:<action>")]
    Malformed(String),
}

/// Failure while obtaining a bearer token from the authorization endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization endpoint unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("authorization endpoint rejected the token request with status {status}")]
    Rejected { status: StatusCode },

    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

/// Failure of a registry API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid repository name '{name}': {reason}")]
    InvalidRepositoryName { name: String, reason: String },

    #[error("authentication failed: {0}")]
    AuthFailed(#[from] AuthError),

    #[error("registry unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("malformed registry response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// True when either leg of the call failed at the transport level,
    /// including TLS trust failures.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            ApiError::Unreachable(_) | ApiError::AuthFailed(AuthError::Unreachable(_))
        )
    }
}
