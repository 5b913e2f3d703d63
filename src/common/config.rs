//! Configuration for the test cluster and its client

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the working directory when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "testcluster";

/// Prefix of environment variable overrides (`TESTCLUSTER_SERVICE_ADDRESS`, ...)
pub const ENV_PREFIX: &str = "TESTCLUSTER";

/// Options bag shared by the orchestrator, the mocks and the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Directory endpoint (`host:port`) the client contacts.
    /// Empty means "use the started directory mock".
    #[serde(default)]
    pub service_address: String,

    /// Host the mock services bind their ephemeral ports on
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Client connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Client per-request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Upper bound on a mock's graceful shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,

    /// Object size used to stripe file data across storage devices
    #[serde(default = "default_stripe_size")]
    pub stripe_size: u64,

    /// Transport security for the client (none by default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsOptions>,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Client-side TLS settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsOptions {
    /// PEM file with the CA certificate the services are signed with
    pub ca_cert_path: PathBuf,
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}
fn default_connect_timeout() -> u64 {
    5_000
}
fn default_request_timeout() -> u64 {
    10_000
}
fn default_shutdown_timeout() -> u64 {
    5_000
}
fn default_stripe_size() -> u64 {
    128 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            service_address: String::new(),
            bind_host: default_bind_host(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            shutdown_timeout_ms: default_shutdown_timeout(),
            stripe_size: default_stripe_size(),
            tls: None,
            log_level: default_log_level(),
        }
    }
}

impl ClusterConfig {
    /// Load configuration: defaults, then the TOML file, then `TESTCLUSTER_*`
    /// environment variables (nested keys use `__`, e.g. `TESTCLUSTER_TLS__CA_CERT_PATH`).
    ///
    /// Without an explicit path an optional `testcluster.toml` in the
    /// working directory is picked up.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: ClusterConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the mocks or the client cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.bind_host.trim().is_empty() {
            return Err(Error::InvalidConfig("bind_host cannot be empty".into()));
        }
        if self.stripe_size == 0 {
            return Err(Error::InvalidConfig("stripe_size must be positive".into()));
        }
        if self.request_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(Error::InvalidConfig("timeouts must be positive".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
