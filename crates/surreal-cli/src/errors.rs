//! Error types for the probe runtime.

use std::io;
use std::sync::Arc;

use surreal_config::EndpointParseError;
use surreal_rpc::RpcError;
use surreal_ws::WsError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointParseError),
    #[error("failed to start the async runtime: {0}")]
    Runtime(io::Error),
    #[error(transparent)]
    Connection(#[from] WsError),
    #[error("failed to connect to {endpoint}: {source}")]
    Connect { endpoint: String, source: RpcError },
    #[error("{operation} request failed: {source}")]
    Request {
        operation: &'static str,
        source: RpcError,
    },
    #[error("failed to write output: {0}")]
    Output(io::Error),
}

impl AppError {
    /// Wraps a failed RPC with the name of the operation that issued it.
    pub(crate) fn request(operation: &'static str) -> impl FnOnce(RpcError) -> Self {
        move |source| Self::Request { operation, source }
    }
}
