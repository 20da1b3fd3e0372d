//! Registry Browser Library
//!
//! Lists the repositories and tags of a Docker registry that sits behind a
//! token service: a bearer token is requested with Basic credentials for each
//! call, then presented to the registry's catalog or tag-list endpoint.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod tls;

pub use config::{AuthConfig, RegistryConfig, Timeouts};
pub use error::{ApiError, AuthError, ConfigError, Result, ScopeError};
pub use registry::{RegistryClient, RepositoryList, Scope, TagList, Token};
pub use tls::{CaBundle, TlsMode, build_client};
