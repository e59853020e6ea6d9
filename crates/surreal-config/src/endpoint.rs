use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::RPC_PATH;

/// Location of the database server's RPC endpoint.
///
/// Endpoints are written as WebSocket URLs (`ws://host:port/rpc` or
/// `wss://…`). A URL without a path is completed with the standard `/rpc`
/// path so `ws://db.internal:8000` and `ws://db.internal:8000/rpc` are
/// equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServerEndpoint {
    secure: bool,
    host: String,
    port: u16,
    path: String,
}

impl ServerEndpoint {
    /// Builds a plain-text endpoint for the given host and port.
    #[must_use]
    pub fn from_host_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            secure: false,
            host: host.into(),
            port,
            path: RPC_PATH.to_owned(),
        }
    }

    /// Returns the endpoint with TLS (`wss`) enabled.
    #[must_use]
    pub fn with_tls(mut self) -> Self {
        self.secure = true;
        self
    }

    /// Host name or address of the server.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port of the server.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the endpoint uses `wss`.
    #[must_use]
    pub const fn is_secure(&self) -> bool {
        self.secure
    }

    /// Path of the RPC resource.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Renders the endpoint as a URL suitable for a WebSocket handshake.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError::InvalidUrl`] when the host cannot be
    /// represented in a URL.
    pub fn url(&self) -> Result<Url, EndpointParseError> {
        Url::parse(&self.to_string()).map_err(|source| EndpointParseError::InvalidUrl {
            input: self.to_string(),
            source,
        })
    }

    const fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}://{}:{}{}",
            self.scheme(),
            self.host,
            self.port,
            self.path
        )
    }
}

impl FromStr for ServerEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input).map_err(|source| EndpointParseError::InvalidUrl {
            input: input.to_owned(),
            source,
        })?;

        let secure = match url.scheme() {
            "ws" => false,
            "wss" => true,
            other => {
                return Err(EndpointParseError::UnsupportedScheme {
                    scheme: other.to_owned(),
                });
            }
        };

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| EndpointParseError::MissingHost {
                input: input.to_owned(),
            })?
            .to_owned();

        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointParseError::MissingHost {
                input: input.to_owned(),
            })?;

        let path = match url.path() {
            "" | "/" => RPC_PATH.to_owned(),
            other => other.to_owned(),
        };

        Ok(Self {
            secure,
            host,
            port,
            path,
        })
    }
}

impl TryFrom<String> for ServerEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerEndpoint> for String {
    fn from(endpoint: ServerEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors raised while parsing a [`ServerEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// The value was not a URL.
    #[error("'{input}' is not a valid endpoint URL: {source}")]
    InvalidUrl {
        /// Text that failed to parse.
        input: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// The URL used a scheme other than `ws` or `wss`.
    #[error("unsupported endpoint scheme '{scheme}', expected ws or wss")]
    UnsupportedScheme {
        /// Scheme found in the URL.
        scheme: String,
    },
    /// The URL did not name a host.
    #[error("endpoint '{input}' does not name a host")]
    MissingHost {
        /// Text that failed to parse.
        input: String,
    },
}
