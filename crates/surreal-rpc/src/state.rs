//! Connection state shared between callers and connection events.
//!
//! [`ConnectionStateMachine`] is the single owner of the connection state and
//! of the table of in-flight requests. Every transition runs under one mutex,
//! so transitions are totally ordered: a request is either registered before
//! a disconnect (and then failed by it) or observes the disconnected state
//! and fails immediately.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::connection::CloseCode;
use crate::error::RpcError;
use crate::response::Response;

/// Log target for state transitions.
const STATE_TARGET: &str = "surreal_rpc::state";

/// Resolves a pending `connect` call.
pub(crate) type ConnectWaiter = oneshot::Sender<Result<(), RpcError>>;

/// Resolves a pending request.
pub(crate) type ResponseWaiter = oneshot::Sender<Result<Response, RpcError>>;

enum ConnectionState {
    Idle,
    Connecting(ConnectWaiter),
    Connected(HashMap<u64, ResponseWaiter>),
    Disconnected(CloseCode),
    Faulted {
        /// Connect call that was outstanding when a second connect faulted
        /// the socket; resolved once the connection reports its outcome.
        orphaned_connect: Option<ConnectWaiter>,
    },
}

/// Snapshot of the connection state, for observation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Never connected.
    Idle,
    /// A connect call is outstanding.
    Connecting,
    /// Connected, with the given number of requests awaiting a response.
    Connected {
        /// Requests awaiting a response.
        in_flight: usize,
    },
    /// The connection closed with the given code.
    Disconnected(CloseCode),
    /// The socket failed permanently.
    Faulted,
}

/// What the caller should do after a connect completion was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConnectCompletion {
    /// The pending connect call succeeded.
    Connected,
    /// No connect call was pending; the signal was ignored.
    Ignored,
    /// The socket is faulted; the fresh connection must be closed.
    Rejected,
}

/// Serialised owner of the connection state and the request ID counter.
pub(crate) struct ConnectionStateMachine {
    state: Mutex<ConnectionState>,
    next_request_id: AtomicU64,
}

impl ConnectionStateMachine {
    pub(crate) const fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Idle),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Allocates the next request ID, wrapping on overflow.
    pub(crate) fn allocate_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::AcqRel)
    }

    pub(crate) fn is_connected(&self) -> bool {
        matches!(*self.lock(), ConnectionState::Connected(_))
    }

    pub(crate) fn phase(&self) -> ConnectionPhase {
        match &*self.lock() {
            ConnectionState::Idle => ConnectionPhase::Idle,
            ConnectionState::Connecting(_) => ConnectionPhase::Connecting,
            ConnectionState::Connected(waiters) => ConnectionPhase::Connected {
                in_flight: waiters.len(),
            },
            ConnectionState::Disconnected(code) => ConnectionPhase::Disconnected(*code),
            ConnectionState::Faulted { .. } => ConnectionPhase::Faulted,
        }
    }

    /// Records an outstanding connect call.
    ///
    /// Returns `true` when the caller should ask the connection to connect.
    /// Connecting while already connecting or connected is a contract
    /// violation and faults the socket.
    pub(crate) fn start_connecting(&self, waiter: ConnectWaiter) -> bool {
        let mut state = self.lock();
        match mem::replace(&mut *state, ConnectionState::faulted()) {
            ConnectionState::Idle | ConnectionState::Disconnected(_) => {
                debug!(target: STATE_TARGET, "connecting");
                *state = ConnectionState::Connecting(waiter);
                true
            }
            ConnectionState::Connecting(pending) => {
                warn!(target: STATE_TARGET, "connect requested while already connecting");
                *state = ConnectionState::Faulted {
                    orphaned_connect: Some(pending),
                };
                resolve(waiter, Err(RpcError::AlreadyConnecting));
                false
            }
            ConnectionState::Connected(waiters) => {
                warn!(target: STATE_TARGET, "connect requested while already connected");
                fail_all(waiters, &RpcError::Faulted);
                resolve(waiter, Err(RpcError::AlreadyConnected));
                false
            }
            faulted @ ConnectionState::Faulted { .. } => {
                *state = faulted;
                resolve(waiter, Err(RpcError::Faulted));
                false
            }
        }
    }

    /// Completes the outstanding connect call.
    ///
    /// Late or duplicate completions are ignored.
    pub(crate) fn finish_connecting(&self) -> ConnectCompletion {
        let mut state = self.lock();
        match mem::replace(&mut *state, ConnectionState::Idle) {
            ConnectionState::Connecting(waiter) => {
                debug!(target: STATE_TARGET, "connected");
                *state = ConnectionState::Connected(HashMap::new());
                resolve(waiter, Ok(()));
                ConnectCompletion::Connected
            }
            ConnectionState::Faulted { orphaned_connect } => {
                *state = ConnectionState::faulted();
                if let Some(waiter) = orphaned_connect {
                    resolve(waiter, Err(RpcError::Faulted));
                }
                ConnectCompletion::Rejected
            }
            other => {
                *state = other;
                debug!(target: STATE_TARGET, "ignoring connect completion with no pending connect");
                ConnectCompletion::Ignored
            }
        }
    }

    /// Records that the connection closed, failing all pending work.
    ///
    /// A faulted socket stays faulted.
    pub(crate) fn disconnect(&self, code: CloseCode) {
        let error = RpcError::Disconnected { code };
        let mut state = self.lock();
        match mem::replace(&mut *state, ConnectionState::Disconnected(code)) {
            ConnectionState::Connecting(waiter) => {
                debug!(target: STATE_TARGET, %code, "disconnected while connecting");
                resolve(waiter, Err(error));
            }
            ConnectionState::Connected(waiters) => {
                debug!(
                    target: STATE_TARGET,
                    %code,
                    in_flight = waiters.len(),
                    "disconnected"
                );
                fail_all(waiters, &error);
            }
            ConnectionState::Faulted { orphaned_connect } => {
                *state = ConnectionState::faulted();
                if let Some(waiter) = orphaned_connect {
                    resolve(waiter, Err(error));
                }
            }
            ConnectionState::Idle | ConnectionState::Disconnected(_) => {
                debug!(target: STATE_TARGET, %code, "disconnected");
            }
        }
    }

    /// Faults the socket permanently, failing all pending work with `error`.
    pub(crate) fn fault(&self, error: &RpcError) {
        let mut state = self.lock();
        warn!(target: STATE_TARGET, %error, "socket faulted");
        match mem::replace(&mut *state, ConnectionState::faulted()) {
            ConnectionState::Connecting(waiter)
            | ConnectionState::Faulted {
                orphaned_connect: Some(waiter),
            } => resolve(waiter, Err(error.clone())),
            ConnectionState::Connected(waiters) => fail_all(waiters, error),
            ConnectionState::Idle
            | ConnectionState::Disconnected(_)
            | ConnectionState::Faulted {
                orphaned_connect: None,
            } => {}
        }
    }

    /// Fails all pending work with a transport `error` without faulting.
    ///
    /// The socket ends up `Disconnected` with [`CloseCode::ABNORMAL`] and may
    /// connect again. A faulted socket stays faulted.
    pub(crate) fn interrupt(&self, error: &RpcError) {
        let mut state = self.lock();
        let interrupted = ConnectionState::Disconnected(CloseCode::ABNORMAL);
        match mem::replace(&mut *state, interrupted) {
            ConnectionState::Connecting(waiter) => {
                debug!(target: STATE_TARGET, %error, "connect interrupted");
                resolve(waiter, Err(error.clone()));
            }
            ConnectionState::Connected(waiters) => {
                debug!(
                    target: STATE_TARGET,
                    %error,
                    in_flight = waiters.len(),
                    "connection interrupted"
                );
                fail_all(waiters, error);
            }
            ConnectionState::Faulted { orphaned_connect } => {
                *state = ConnectionState::faulted();
                if let Some(waiter) = orphaned_connect {
                    resolve(waiter, Err(error.clone()));
                }
            }
            previous @ (ConnectionState::Idle | ConnectionState::Disconnected(_)) => {
                *state = previous;
            }
        }
    }

    /// Registers a waiter for the response to request `id`.
    ///
    /// Returns `true` when the request should be transmitted. Otherwise the
    /// waiter has already been failed.
    pub(crate) fn register_request(&self, id: u64, waiter: ResponseWaiter) -> bool {
        let mut state = self.lock();
        match &mut *state {
            ConnectionState::Connected(waiters) => {
                if waiters.contains_key(&id) {
                    let error = RpcError::DuplicateRequestId { id };
                    warn!(target: STATE_TARGET, id, "request ID registered twice");
                    if let ConnectionState::Connected(pending) =
                        mem::replace(&mut *state, ConnectionState::faulted())
                    {
                        fail_all(pending, &error);
                    }
                    resolve(waiter, Err(error));
                    return false;
                }
                waiters.insert(id, waiter);
                true
            }
            ConnectionState::Faulted { .. } => {
                resolve(waiter, Err(RpcError::Faulted));
                false
            }
            ConnectionState::Idle
            | ConnectionState::Connecting(_)
            | ConnectionState::Disconnected(_) => {
                resolve(waiter, Err(RpcError::NotConnected));
                false
            }
        }
    }

    /// Hands a response to the waiter registered under its request ID.
    ///
    /// Responses nobody is waiting for are dropped.
    pub(crate) fn resolve_response(&self, response: Response) {
        let mut state = self.lock();
        let ConnectionState::Connected(waiters) = &mut *state else {
            debug!(
                target: STATE_TARGET,
                id = response.request_id(),
                "dropping response received while not connected"
            );
            return;
        };

        match waiters.remove(&response.request_id()) {
            Some(waiter) => resolve(waiter, Ok(response)),
            None => debug!(
                target: STATE_TARGET,
                id = response.request_id(),
                "dropping response with no registered waiter"
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        // Waiters are resolved without panicking, so a poisoned lock still
        // holds a consistent state.
        self.state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

impl ConnectionState {
    const fn faulted() -> Self {
        Self::Faulted {
            orphaned_connect: None,
        }
    }
}

fn resolve<T>(waiter: oneshot::Sender<Result<T, RpcError>>, outcome: Result<T, RpcError>) {
    if waiter.send(outcome).is_err() {
        debug!(target: STATE_TARGET, "waiter abandoned before resolution");
    }
}

fn fail_all(waiters: HashMap<u64, ResponseWaiter>, error: &RpcError) {
    for waiter in waiters.into_values() {
        resolve(waiter, Err(error.clone()));
    }
}
