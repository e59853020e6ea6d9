//! Errors raised by the WebSocket connection.

use thiserror::Error;
use tokio::runtime::TryCurrentError;
use tokio_tungstenite::tungstenite;

/// Failures of the WebSocket connection.
///
/// Failures after construction are reported through
/// [`surreal_rpc::ConnectionEvents::on_error`] using their display text.
#[derive(Debug, Error)]
pub enum WsError {
    /// No tokio runtime was available to drive the connection.
    #[error("no tokio runtime available to drive the connection: {0}")]
    NoRuntime(#[from] TryCurrentError),

    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}: {source}")]
    Handshake {
        /// Server address.
        url: String,
        /// Underlying protocol or IO error.
        #[source]
        source: Box<tungstenite::Error>,
    },

    /// Reading from or writing to an established connection failed.
    #[error("connection failed: {0}")]
    Stream(#[source] Box<tungstenite::Error>),
}
