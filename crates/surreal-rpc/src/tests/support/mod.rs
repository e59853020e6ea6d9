//! Shared fixtures and helpers for multiplexer tests.

mod scripted;

use std::time::Duration;

use url::Url;

use crate::RpcSocket;

pub use scripted::{ScriptedConnection, request_id};

/// Upper bound on how long a test waits for spawned calls to make progress.
const SETTLE_LIMIT: Duration = Duration::from_secs(5);

/// Address handed to `connect` in tests.
pub fn test_url() -> Url {
    Url::parse("ws://localhost:8000/rpc").expect("invalid test URL")
}

/// Yields to other tasks until `condition` holds.
///
/// # Panics
///
/// Panics when the condition does not hold within [`SETTLE_LIMIT`].
pub async fn settle(condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(SETTLE_LIMIT, async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition did not hold within {SETTLE_LIMIT:?}");
}

/// Builds a socket over a connection that completes connects immediately,
/// and connects it.
pub async fn connected_socket() -> (RpcSocket<ScriptedConnection>, ScriptedConnection) {
    let script = ScriptedConnection::auto_connecting();
    let socket = RpcSocket::new(script.clone());
    socket
        .connect(&test_url())
        .await
        .expect("scripted connect should succeed");
    (socket, script)
}
