// Registry API client: catalog and tag listing behind token authentication.
//
// Every call builds its own HTTP client and obtains its own token, so a
// `RegistryClient` holds nothing but immutable configuration and can be shared
// freely between tasks.

use crate::config::RegistryConfig;
use crate::error::{ApiError, ConfigError, Result};
use crate::registry::auth::{TokenAuthenticator, TokenSource};
use crate::registry::models::{RepositoryList, TagList};
use crate::registry::scope::{RepositoryName, Scope};
use crate::tls::build_client;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

pub struct RegistryClientBuilder<S = TokenAuthenticator> {
    config: RegistryConfig,
    token_source: S,
}

impl RegistryClientBuilder<TokenAuthenticator> {
    pub fn new(config: RegistryConfig) -> Self {
        let token_source = TokenAuthenticator::from_config(&config);
        Self {
            config,
            token_source,
        }
    }
}

impl<S: TokenSource> RegistryClientBuilder<S> {
    /// Replace the token source, e.g. with a caching wrapper.
    pub fn with_token_source<T: TokenSource>(self, token_source: T) -> RegistryClientBuilder<T> {
        RegistryClientBuilder {
            config: self.config,
            token_source,
        }
    }

    /// Validate the configuration and check that a client can be built from
    /// it, so that configuration problems surface here rather than per call.
    pub fn build(self) -> Result<RegistryClient<S>, ConfigError> {
        self.config.validate()?;
        build_client(&self.config.tls, &self.config.timeouts)?;

        debug!(
            registry = %self.config.registry_url,
            auth = %self.config.auth_url,
            tls = %self.config.tls,
            "registry client configured"
        );

        Ok(RegistryClient {
            config: self.config,
            token_source: self.token_source,
        })
    }
}

pub struct RegistryClient<S = TokenAuthenticator> {
    config: RegistryConfig,
    token_source: S,
}

impl RegistryClient<TokenAuthenticator> {
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    pub fn builder(config: RegistryConfig) -> RegistryClientBuilder<TokenAuthenticator> {
        RegistryClientBuilder::new(config)
    }
}

impl<S: TokenSource> RegistryClient<S> {
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// List every repository in the registry catalog, in registry order.
    #[instrument(skip(self))]
    pub async fn list_repositories(&self) -> Result<RepositoryList> {
        let url = self.endpoint("_catalog")?;
        self.fetch(&self.config.catalog_scope, url).await
    }

    /// List the tags of one repository.
    ///
    /// The name is checked before anything is sent over the network.
    #[instrument(skip(self))]
    pub async fn list_tags(&self, image: &str) -> Result<TagList> {
        let name = RepositoryName::parse(image).map_err(|reason| ApiError::InvalidRepositoryName {
            name: image.to_string(),
            reason,
        })?;

        let url = self.endpoint(&format!("{}/tags/list", name))?;
        self.fetch(&Scope::pull(&name), url).await
    }

    /// List tags for several repositories concurrently, keeping input order.
    /// Fails with the first error encountered.
    pub async fn list_tags_many<I>(&self, images: I) -> Result<Vec<TagList>>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let images: Vec<I::Item> = images.into_iter().collect();
        try_join_all(images.iter().map(|image| self.list_tags(image.as_ref()))).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.config.registry_url.join(path).map_err(|e| {
            ConfigError::InvalidEndpoint {
                url: format!("{}{}", self.config.registry_url, path),
                reason: e.to_string(),
            }
            .into()
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, scope: &Scope, url: Url) -> Result<T> {
        let client = build_client(&self.config.tls, &self.config.timeouts)?;

        let token = self.token_source.authenticate(&client, scope).await?;
        debug!(%scope, "authenticated");

        let response = client
            .get(url.clone())
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(ApiError::Unreachable)?;

        let status = response.status();
        debug!(%url, %status, "fetched");

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::MalformedResponse(format!("failed to read body: {}", e)))?;

        serde_json::from_slice(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("status {}: {}", status, e)))
    }
}
