//! Registry module for Docker registry interactions
//!
//! This module provides token authentication and the catalog/tag listing
//! client for the Docker Registry HTTP API v2.

pub mod auth;
pub mod client;
pub mod models;
pub mod scope;

pub use auth::{TokenAuthenticator, TokenSource};
pub use client::{RegistryClient, RegistryClientBuilder};
pub use models::{RepositoryList, TagList, Token};
pub use scope::{RepositoryName, Scope, build_scope};
