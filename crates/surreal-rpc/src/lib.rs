//! Client-side RPC transport for a document database server.
//!
//! The crate multiplexes many concurrent logical requests over a single
//! duplex connection. Each request is tagged with a fresh numeric ID and the
//! caller is suspended until the response carrying that ID arrives, so the
//! server is free to answer requests in any order. Connection-level failures
//! (a disconnect, a transport error, or a frame that does not parse as a
//! response envelope) are broadcast to every caller still waiting.
//!
//! The physical connection is abstracted behind the [`Connection`] trait so
//! the multiplexer can run over a WebSocket in production and over an
//! in-memory script in tests.

mod client;
mod connection;
mod error;
mod method;
mod request;
mod response;
mod socket;
mod state;

#[cfg(test)]
mod tests;

pub use client::{DatabaseIdentifier, SurrealClient};
pub use connection::{
    CloseCode, Connection, ConnectionEvents, EventHandler, Payload, TransportFailure,
};
pub use error::RpcError;
pub use method::{Null, Ping, RpcMethod, Signin, Use, Version};
pub use request::{Params, Request};
pub use response::{Outcome, Response};
pub use socket::RpcSocket;
pub use state::ConnectionPhase;
