//! Configuration types and loading
//!
//! Config path precedence: `--config` > `CONFIG_PATH` env var > default file
//! name in the working directory. Every field has a default, so a missing
//! default file is not an error: the launcher runs against the built-in
//! TrendMiner server and accounts. Secrets never appear in this file; they
//! are read from the OS keyring.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use token_refresh::DEFAULT_REFRESH_INTERVAL;
use trendminer_auth::{
    DEFAULT_CLIENT_ID, DEFAULT_REALM, DEFAULT_SERVER_URL, DEFAULT_USERNAME, token_endpoint,
};

/// Config file looked up when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "trendminer-notebook.toml";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    /// TrendMiner server; also the keyring service name for both secrets
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_realm")]
    pub realm: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub launch: LaunchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Notebook server process settings
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Environment variable carrying the server URL to the kernels
    #[serde(default = "default_server_url_var")]
    pub server_url_var: String,
    /// Environment variable carrying the bearer token to the kernels
    #[serde(default = "default_token_var")]
    pub token_var: String,
    /// Optional file kept in sync with the current token, for kernels that
    /// re-read the token after startup
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

/// Prometheus scrape endpoint; disabled when `listen_addr` is unset
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub listen_addr: Option<SocketAddr>,
}

/// A config path together with whether the user asked for it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPath {
    pub path: PathBuf,
    pub explicit: bool,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_owned()
}

fn default_realm() -> String {
    DEFAULT_REALM.to_owned()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_owned()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_owned()
}

fn default_refresh_interval() -> u64 {
    DEFAULT_REFRESH_INTERVAL.as_secs()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_program() -> String {
    "jupyter".to_owned()
}

fn default_args() -> Vec<String> {
    vec!["notebook".to_owned()]
}

fn default_server_url_var() -> String {
    "KERNEL_SERVER_URL".to_owned()
}

fn default_token_var() -> String {
    "KERNEL_USER_TOKEN".to_owned()
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            server_url_var: default_server_url_var(),
            token_var: default_token_var(),
            token_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            realm: default_realm(),
            client_id: default_client_id(),
            username: default_username(),
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_secs: default_request_timeout(),
            launch: LaunchConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Load the resolved path, falling back to defaults when the implicit
    /// default file is absent. An explicit path must exist.
    pub fn load_or_default(resolved: &ConfigPath) -> common::Result<Self> {
        if !resolved.explicit && !resolved.path.exists() {
            return Ok(Self::default());
        }
        Self::load(&resolved.path)
    }

    /// Parse and validate TOML configuration text.
    pub fn parse(contents: &str) -> common::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "server_url must start with http:// or https://, got: {}",
                self.server_url
            )));
        }

        if self.realm.trim().is_empty() {
            return Err(common::Error::Config("realm must not be empty".into()));
        }

        if self.refresh_interval_secs == 0 {
            return Err(common::Error::Config(
                "refresh_interval_secs must be greater than 0".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(common::Error::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.launch.program.trim().is_empty() {
            return Err(common::Error::Config(
                "launch.program must not be empty".into(),
            ));
        }

        for (field, name) in [
            ("launch.server_url_var", &self.launch.server_url_var),
            ("launch.token_var", &self.launch.token_var),
        ] {
            if name.is_empty() || name.contains('=') || name.contains('\0') {
                return Err(common::Error::Config(format!(
                    "{field} is not a valid environment variable name: {name:?}"
                )));
            }
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> ConfigPath {
        if let Some(p) = cli_path {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return ConfigPath {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigPath {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
            explicit: false,
        }
    }

    pub fn token_endpoint(&self) -> String {
        token_endpoint(&self.server_url, &self.realm)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
