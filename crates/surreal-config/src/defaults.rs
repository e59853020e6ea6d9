use crate::endpoint::ServerEndpoint;
use crate::logging::LogFormat;

/// Host used when no endpoint is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port the database server listens on by default.
pub const DEFAULT_PORT: u16 = 8000;

/// Path of the RPC endpoint on the database server.
pub const RPC_PATH: &str = "/rpc";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Endpoint of a database server running locally with stock settings.
#[must_use]
pub fn default_endpoint() -> ServerEndpoint {
    ServerEndpoint::from_host_port(DEFAULT_HOST, DEFAULT_PORT)
}
