//! Runner: turns parsed arguments into registry calls and rendered output

use crate::cli::args::{Args, Command};
use crate::config::{AuthConfig, RegistryConfig, Timeouts};
use crate::error::{ApiError, ConfigError, ScopeError};
use crate::logging::Logger;
use crate::registry::{RegistryClient, RepositoryList, Scope, TagList};
use crate::tls::TlsMode;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

pub struct Runner {
    args: Args,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Self {
        let output = if args.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(args.verbose)
        };

        Self { args, output }
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<(), RunError> {
        self.args.validate().map_err(RunError::InvalidArguments)?;

        let config = self.build_config()?;
        self.output.verbose(&format!("Registry: {}", config.registry_url));
        self.output.verbose(&format!("Token service: {} ({})", config.auth_url, config.service));
        if config.tls.is_insecure() {
            self.output
                .warning("TLS certificate verification is disabled for this session");
        }

        let client = RegistryClient::new(config)?;

        match &self.args.command {
            Command::Repos => {
                let repositories = client.list_repositories().await?;
                self.render_repositories(&repositories)?;
            }
            Command::Tags { images } => {
                let tag_lists = client.list_tags_many(images).await?;
                self.render_tags(&tag_lists)?;
            }
        }

        if let Some(elapsed) = self.output.elapsed() {
            self.output
                .verbose(&format!("Completed in {}", self.output.format_duration(elapsed)));
        }
        Ok(())
    }

    /// Resolve the arguments into a client configuration.
    pub fn build_config(&self) -> Result<RegistryConfig, RunError> {
        let args = &self.args;

        let tls = match (&args.ca_cert, args.insecure) {
            (Some(path), false) => TlsMode::verified_from_file(path)?,
            (None, true) => TlsMode::Insecure,
            _ => {
                return Err(RunError::InvalidArguments(
                    "exactly one of --ca-cert or --insecure is required".to_string(),
                ));
            }
        };

        let credentials = AuthConfig::new(
            args.username.clone().unwrap_or_default(),
            args.password.clone().unwrap_or_default(),
        );

        let mut config = match (&args.registry_url, &args.host) {
            (Some(registry_url), host) => {
                let auth_url = match (&args.auth_url, host) {
                    (Some(auth_url), _) => auth_url.clone(),
                    (None, Some(host)) => RegistryConfig::for_host(host, credentials.clone(), tls.clone())?
                        .auth_url
                        .to_string(),
                    (None, None) => {
                        return Err(RunError::InvalidArguments(
                            "--auth-url is required with --registry-url".to_string(),
                        ));
                    }
                };
                RegistryConfig::new(registry_url, &auth_url, credentials, tls)?
            }
            (None, Some(host)) => {
                let config = RegistryConfig::for_host(host, credentials, tls)?;
                match &args.auth_url {
                    Some(auth_url) => config.with_auth_url(auth_url)?,
                    None => config,
                }
            }
            (None, None) => {
                return Err(RunError::InvalidArguments(
                    "either --host or --registry-url is required".to_string(),
                ));
            }
        };

        if let Some(service) = &args.service {
            config = config.with_service(service.clone());
        }

        if let Some(scope) = &args.catalog_scope {
            let scope: Scope = scope
                .parse()
                .map_err(|e: ScopeError| RunError::InvalidArguments(e.to_string()))?;
            config = config.with_catalog_scope(scope);
        }

        let defaults = Timeouts::default();
        Ok(config.with_timeouts(Timeouts {
            connect: Duration::from_secs(args.connect_timeout),
            request: args.timeout.map_or(defaults.request, Duration::from_secs),
        }))
    }

    fn json(&self) -> bool {
        self.args.output == "json"
    }

    fn render_repositories(&self, repositories: &RepositoryList) -> Result<(), RunError> {
        if self.json() {
            self.output.result(&serde_json::to_string_pretty(repositories)?);
            return Ok(());
        }

        self.output.list(
            &format!("Repositories ({})", repositories.repositories.len()),
            &repositories.repositories,
        );
        self.output
            .success(&format!("Listed {} repositories", repositories.repositories.len()));
        Ok(())
    }

    fn render_tags(&self, tag_lists: &[TagList]) -> Result<(), RunError> {
        if self.json() {
            let rendered = match tag_lists {
                [single] => serde_json::to_string_pretty(single)?,
                many => serde_json::to_string_pretty(many)?,
            };
            self.output.result(&rendered);
            return Ok(());
        }

        for tag_list in tag_lists {
            self.output
                .list(&format!("Tags of {} ({})", tag_list.name, tag_list.tags.len()), &tag_list.tags);
        }
        self.output
            .success(&format!("Listed tags of {} repositories", tag_lists.len()));
        Ok(())
    }
}
