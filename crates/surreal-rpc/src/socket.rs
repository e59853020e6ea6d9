//! Request multiplexer over a single [`Connection`].

use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use url::Url;

use crate::connection::{CloseCode, Connection, ConnectionEvents, Payload, TransportFailure};
use crate::error::RpcError;
use crate::method::{Null, RpcMethod};
use crate::request::{Params, Request};
use crate::response::{Outcome, Response};
use crate::state::{ConnectCompletion, ConnectionPhase, ConnectionStateMachine};

/// Log target for multiplexer operations.
const SOCKET_TARGET: &str = "surreal_rpc::socket";

/// Multiplexes concurrent requests over one connection.
///
/// Any number of tasks may call [`RpcSocket::call`] at once; each call
/// suspends until the response carrying its own request ID arrives, so the
/// server may answer in any order. A disconnect or transport error fails
/// every call still waiting.
///
/// # Example
///
/// ```ignore
/// use surreal_rpc::{RpcSocket, Version};
///
/// let socket = RpcSocket::new(connection);
/// socket.connect(&url).await?;
/// let version = socket.request(&Version).await?;
/// ```
pub struct RpcSocket<C: Connection> {
    shared: Arc<Shared<C>>,
}

struct Shared<C> {
    connection: C,
    state: ConnectionStateMachine,
}

impl<C: Connection> RpcSocket<C> {
    /// Wraps `connection` and registers for its events.
    pub fn new(connection: C) -> Self {
        let shared = Arc::new(Shared {
            connection,
            state: ConnectionStateMachine::new(),
        });
        let events = Arc::new(SocketEvents {
            shared: Arc::downgrade(&shared),
        });
        shared.connection.register(events);
        Self { shared }
    }

    /// Connects to the server at `url`.
    ///
    /// Suspends until the connection reports that it is connected.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::AlreadyConnecting`] or [`RpcError::AlreadyConnected`]
    /// on a second connect, which also faults the socket;
    /// [`RpcError::Faulted`] once the socket is faulted; or the failure the
    /// connection reported while connecting.
    pub async fn connect(&self, url: &Url) -> Result<(), RpcError> {
        let (waiter, outcome) = oneshot::channel();
        if self.shared.state.start_connecting(waiter) {
            debug!(target: SOCKET_TARGET, %url, "connecting");
            self.shared.connection.connect(url);
        }
        outcome.await.unwrap_or(Err(RpcError::Closed))
    }

    /// Closes the connection if it is open. Does nothing otherwise.
    pub fn disconnect_now(&self) {
        self.shared.close_connection();
    }

    /// Whether the socket is connected and accepting requests.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_connected()
    }

    /// Snapshot of the connection state.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        self.shared.state.phase()
    }

    /// Calls `method` and decodes its result as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Remote`] when the server answers with an error,
    /// [`RpcError::InvalidResult`] when the result does not decode as `T`, or
    /// the connection-level failure that ended the call.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Params,
    ) -> Result<T, RpcError> {
        let payload = self.send(method, params).await?;
        T::deserialize(&payload).map_err(|error| RpcError::invalid_result(&payload, error))
    }

    /// Calls a method that returns no content.
    ///
    /// # Errors
    ///
    /// As [`RpcSocket::call`]; any result other than `null` is reported as
    /// [`RpcError::InvalidResult`].
    pub async fn call_void(&self, method: &str, params: Params) -> Result<(), RpcError> {
        let payload = self.send(method, params).await?;
        if payload.is_null() {
            Ok(())
        } else {
            Err(RpcError::invalid_result(&payload, "expected null"))
        }
    }

    /// Invokes a typed method.
    ///
    /// # Errors
    ///
    /// As [`RpcSocket::call`].
    pub async fn request<M: RpcMethod>(&self, method: &M) -> Result<M::Output, RpcError> {
        self.call(M::NAME, method.params()?).await
    }

    /// Invokes a typed method that returns no content.
    ///
    /// # Errors
    ///
    /// As [`RpcSocket::call_void`].
    pub async fn request_void<M>(&self, method: &M) -> Result<(), RpcError>
    where
        M: RpcMethod<Output = Null>,
    {
        self.call_void(M::NAME, method.params()?).await
    }

    /// Sends one request and waits for its result payload.
    async fn send(&self, method: &str, params: Params) -> Result<Value, RpcError> {
        let id = self.shared.state.allocate_request_id();
        let frame = Request::new(id, method, params).to_json()?;

        let (waiter, outcome) = oneshot::channel();
        if self.shared.state.register_request(id, waiter) {
            debug!(target: SOCKET_TARGET, id, method, "sending request");
            self.shared.connection.send(frame);
        }

        let response = outcome.await.unwrap_or(Err(RpcError::Closed))?;
        debug_assert_eq!(response.request_id(), id);

        match response.into_outcome() {
            Outcome::Result(payload) => Ok(payload),
            Outcome::Error { code, message } => {
                debug!(target: SOCKET_TARGET, id, method, code, "server returned error");
                Err(RpcError::Remote { code, message })
            }
        }
    }
}

impl<C: Connection> Drop for RpcSocket<C> {
    fn drop(&mut self) {
        self.shared.close_connection();
    }
}

impl<C: Connection + std::fmt::Debug> std::fmt::Debug for RpcSocket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcSocket")
            .field("connection", &self.shared.connection)
            .field("phase", &self.shared.state.phase())
            .finish()
    }
}

impl<C: Connection> Shared<C> {
    fn close_connection(&self) {
        if self.connection.is_connected() {
            debug!(target: SOCKET_TARGET, "closing connection");
            self.connection.disconnect();
        }
    }

    fn fault_and_close(&self, error: &RpcError) {
        self.state.fault(error);
        self.close_connection();
    }
}

/// Routes connection events into the state machine.
///
/// Holds a weak reference so a connection that outlives its socket does not
/// keep it alive.
struct SocketEvents<C> {
    shared: Weak<Shared<C>>,
}

impl<C: Connection> ConnectionEvents for SocketEvents<C> {
    fn on_connected(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        if shared.state.finish_connecting() == ConnectCompletion::Rejected {
            shared.close_connection();
        }
    }

    fn on_disconnected(&self, code: CloseCode) {
        if let Some(shared) = self.shared.upgrade() {
            shared.state.disconnect(code);
        }
    }

    fn on_error(&self, error: TransportFailure) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        warn!(target: SOCKET_TARGET, %error, "connection reported an error");
        shared.state.interrupt(&RpcError::Transport {
            message: error.message().to_owned(),
        });
        shared.close_connection();
    }

    fn on_message(&self, payload: Payload) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let text = payload.into_text();
        match Response::parse(&text) {
            Some(response) => shared.state.resolve_response(response),
            None => {
                warn!(target: SOCKET_TARGET, payload = %text, "received invalid response");
                shared.fault_and_close(&RpcError::InvalidResponse { payload: text });
            }
        }
    }
}
