//! WebSocket connection for the RPC multiplexer.
//!
//! [`WsConnection`] implements [`surreal_rpc::Connection`] over
//! `tokio-tungstenite`. Each connect spawns a task on the captured runtime
//! that owns the stream and reports handshake, frame, and close events back
//! to the multiplexer.

mod connection;
mod error;

#[cfg(test)]
mod tests;

pub use connection::WsConnection;
pub use error::WsError;
