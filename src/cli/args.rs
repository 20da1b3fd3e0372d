//! Command-line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "registry-browser")]
#[command(about = "Browse the repositories and tags of a token-authenticated Docker registry")]
#[command(version, author)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Registry host
    #[arg(
        long = "host",
        short = 'H',
        global = true,
        help = "Registry host (optionally host:port); derives https://<host>/v2/ and https://<host>:5001/auth"
    )]
    pub host: Option<String>,

    /// Registry v2 base URL
    #[arg(
        long = "registry-url",
        global = true,
        help = "Full v2 API base URL, overrides the one derived from --host"
    )]
    pub registry_url: Option<String>,

    /// Token endpoint URL
    #[arg(long = "auth-url", global = true, help = "Token service URL")]
    pub auth_url: Option<String>,

    /// Token service name
    #[arg(
        long = "service",
        global = true,
        help = "Service name sent to the token endpoint [default: Docker registry]"
    )]
    pub service: Option<String>,

    /// Scope used for catalog listing
    #[arg(
        long = "catalog-scope",
        global = true,
        help = "Scope requested for catalog listing [default: registry:catalog:*]"
    )]
    pub catalog_scope: Option<String>,

    /// Registry username
    #[arg(
        long = "username",
        short = 'u',
        global = true,
        help = "Username for registry authentication"
    )]
    pub username: Option<String>,

    /// Registry password
    #[arg(
        long = "password",
        short = 'p',
        global = true,
        help = "Password for registry authentication"
    )]
    pub password: Option<String>,

    /// CA bundle
    #[arg(
        long = "ca-cert",
        global = true,
        help = "PEM bundle of CA certificates to trust exclusively"
    )]
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification
    #[arg(
        long = "insecure",
        short = 'k',
        global = true,
        conflicts_with = "ca_cert",
        help = "Skip TLS certificate verification (dangerous)"
    )]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(
        long = "timeout",
        short = 't',
        global = true,
        help = "Total timeout for each HTTP request in seconds [default: 30]"
    )]
    pub timeout: Option<u64>,

    /// Connect timeout in seconds
    #[arg(
        long = "connect-timeout",
        global = true,
        default_value = "10",
        help = "Connection timeout in seconds"
    )]
    pub connect_timeout: u64,

    /// Output format for results
    #[arg(
        long = "output",
        short = 'o',
        global = true,
        default_value = "text",
        help = "Output format: text, json"
    )]
    pub output: String,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        global = true,
        conflicts_with = "verbose",
        help = "Only print results"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all repositories in the registry catalog
    Repos,
    /// List tags of one or more repositories
    Tags {
        /// Repository names, e.g. library/alpine
        #[arg(required = true)]
        images: Vec<String>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_none() && self.registry_url.is_none() {
            return Err("Either --host or --registry-url must be given".to_string());
        }

        if self.registry_url.is_some() && self.host.is_none() && self.auth_url.is_none() {
            return Err("--auth-url is required when --registry-url is used without --host".to_string());
        }

        match self.username.as_deref() {
            None | Some("") => return Err("A username is required".to_string()),
            Some(_) => {}
        }

        match (&self.ca_cert, self.insecure) {
            (Some(_), true) => {
                return Err("--ca-cert and --insecure cannot be combined".to_string());
            }
            (None, false) => {
                return Err(
                    "A TLS mode is required: pass --ca-cert <bundle> or --insecure".to_string(),
                );
            }
            _ => {}
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.connect_timeout == 0 {
            return Err("Connect timeout must be greater than 0".to_string());
        }

        match self.output.as_str() {
            "text" | "json" => {}
            _ => return Err("Output format must be one of: text, json".to_string()),
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env(self) -> Self {
        self.from_env_with(|key| std::env::var(key).ok())
    }

    /// Fill unset options from `lookup`. Command-line values always win.
    pub fn from_env_with<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.host.is_none() {
            self.host = lookup("DOCKERUI_API_HOST");
        }
        if self.auth_url.is_none() {
            self.auth_url = lookup("DOCKERUI_AUTH_URL");
        }
        if self.service.is_none() {
            self.service = lookup("DOCKERUI_AUTH_SERVICE");
        }
        if self.username.is_none() {
            self.username = lookup("DOCKERUI_USERNAME");
        }
        if self.password.is_none() {
            self.password = lookup("DOCKERUI_PASSWORD");
        }

        // Only consult the environment for TLS when neither flag was given.
        if self.ca_cert.is_none() && !self.insecure {
            if lookup("DOCKERUI_API_SKIP_VERIFICATION").is_some_and(|v| parse_flag(&v)) {
                self.insecure = true;
            } else {
                self.ca_cert = lookup("DOCKERUI_API_CACRT").map(PathBuf::from);
            }
        }

        if self.timeout.is_none() {
            self.timeout = lookup("DOCKERUI_TIMEOUT").and_then(|v| v.parse().ok());
        }

        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}
