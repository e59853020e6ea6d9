//! Shared configuration for the database RPC client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! configuration file, then `SURREAL_*` environment variables, and finally
//! command-line flags. Both the library consumers and the `surreal-rpc`
//! binary resolve their settings through [`Config`].

mod defaults;
mod endpoint;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, RPC_PATH, default_endpoint,
    default_log_filter, default_log_filter_string, default_log_format,
};
pub use endpoint::{EndpointParseError, ServerEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SURREAL")]
pub struct Config {
    /// RPC endpoint of the database server.
    #[serde(default = "default_endpoint")]
    #[ortho_config(default = default_endpoint())]
    pub endpoint: ServerEndpoint,
    /// Namespace selected after connecting.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Database selected after connecting.
    #[serde(default)]
    pub database: Option<String>,
    /// User name presented to `signin`.
    #[serde(default)]
    pub username: Option<String>,
    /// Password presented to `signin`.
    #[serde(default)]
    pub password: Option<String>,
    /// Tracing filter expression.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Config {
    /// RPC endpoint of the database server.
    #[must_use]
    pub const fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    /// Tracing filter expression applied by the binaries.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Output format for log records.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Namespace and database to select, when both are configured.
    #[must_use]
    pub fn database_selection(&self) -> Option<(&str, &str)> {
        match (&self.namespace, &self.database) {
            (Some(namespace), Some(database)) => Some((namespace, database)),
            _ => None,
        }
    }

    /// User name and password to sign in with, when both are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some((username, password)),
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            namespace: None,
            database: None,
            username: None,
            password: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}
