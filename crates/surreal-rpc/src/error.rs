//! Error types surfaced by the RPC transport.

use std::sync::Arc;

use thiserror::Error;

use crate::connection::CloseCode;

/// Errors returned to callers of [`crate::RpcSocket`].
///
/// Connection-level variants are cloned and delivered to every pending
/// caller at once, which is why the type is `Clone`.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// `connect` was called while another connect was outstanding.
    #[error("tried to connect socket while it was already connecting")]
    AlreadyConnecting,

    /// `connect` was called on an already connected socket.
    #[error("tried to connect socket while it was already connected")]
    AlreadyConnected,

    /// A request was issued while the socket was not connected.
    #[error("tried to send request while socket was not connected")]
    NotConnected,

    /// The connection closed while the caller was waiting.
    #[error("socket disconnected with close code {code}")]
    Disconnected {
        /// Close code reported by the connection.
        code: CloseCode,
    },

    /// The underlying connection reported an error.
    #[error("transport error: {message}")]
    Transport {
        /// Description supplied by the connection.
        message: String,
    },

    /// An inbound frame did not match the response envelope.
    #[error("socket received invalid response: {payload}")]
    InvalidResponse {
        /// The offending frame.
        payload: String,
    },

    /// A request ID was registered twice.
    #[error("request ID {id} is already in use")]
    DuplicateRequestId {
        /// The colliding request ID.
        id: u64,
    },

    /// The socket hit an unrecoverable error earlier and refuses further work.
    #[error("socket is faulted and can no longer be used")]
    Faulted,

    /// The server answered the request with an error envelope.
    #[error("server returned error: {message} (code: {code})")]
    Remote {
        /// Error code chosen by the server.
        code: i64,
        /// Error message chosen by the server.
        message: String,
    },

    /// The result payload did not have the shape the caller expected.
    #[error("invalid result {payload}: {reason}")]
    InvalidResult {
        /// The JSON payload returned by the server.
        payload: String,
        /// Why decoding failed.
        reason: String,
    },

    /// Request parameters could not be serialised.
    #[error("failed to encode request: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    /// The waiter was dropped without being resolved.
    #[error("request was dropped before it completed")]
    Closed,
}

impl RpcError {
    /// Whether the error came from the server rather than the transport.
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Whether the socket can no longer be reused after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AlreadyConnecting
                | Self::AlreadyConnected
                | Self::InvalidResponse { .. }
                | Self::DuplicateRequestId { .. }
                | Self::Faulted
        )
    }

    pub(crate) fn invalid_result(payload: &serde_json::Value, reason: impl ToString) -> Self {
        Self::InvalidResult {
            payload: payload.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(error: serde_json::Error) -> Self {
        Self::Encode(Arc::new(error))
    }
}
