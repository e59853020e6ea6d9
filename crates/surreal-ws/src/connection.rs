//! `tokio-tungstenite` implementation of [`Connection`].

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use surreal_rpc::{
    CloseCode, Connection, ConnectionEvents, EventHandler, Payload, TransportFailure,
};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as FrameCloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use url::Url;

use crate::error::WsError;

/// Log target for WebSocket connection events.
const WS_TARGET: &str = "surreal_ws::connection";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Work queued for the connection task.
enum Outbound {
    Text(String),
    Close,
}

/// How a connection task ended.
enum Ending {
    Closed(CloseCode),
    Failed(WsError),
}

/// A WebSocket connection driven by a tokio task.
///
/// The connection captures a runtime handle at construction so that the
/// synchronous [`Connection`] methods can spawn and feed the task from any
/// thread.
pub struct WsConnection {
    runtime: Handle,
    inner: Arc<Inner>,
}

struct Inner {
    events: Mutex<Option<EventHandler>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
    connected: AtomicBool,
    // Bumped on every connect so a superseded task stays silent.
    generation: AtomicU64,
}

impl WsConnection {
    /// Creates a connection whose tasks run on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            inner: Arc::new(Inner {
                events: Mutex::new(None),
                outbound: Mutex::new(None),
                connected: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a connection on the runtime the caller is running in.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::NoRuntime`] outside a tokio runtime.
    pub fn from_current() -> Result<Self, WsError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Connection for WsConnection {
    fn register(&self, events: EventHandler) {
        *lock(&self.inner.events) = Some(events);
    }

    fn connect(&self, url: &Url) {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        *lock(&self.inner.outbound) = Some(sender);

        let session = Session {
            inner: Arc::clone(&self.inner),
            generation,
        };
        debug!(target: WS_TARGET, %url, generation, "spawning connection task");
        self.runtime.spawn(session.run(url.clone(), receiver));
    }

    fn send(&self, frame: String) {
        let queued = lock(&self.inner.outbound)
            .as_ref()
            .is_some_and(|sender| sender.send(Outbound::Text(frame)).is_ok());
        if !queued {
            warn!(target: WS_TARGET, "dropping frame sent while the connection is closed");
        }
    }

    fn disconnect(&self) {
        if !self.inner.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        let sender = lock(&self.inner.outbound).take();
        if sender.is_some_and(|sender| sender.send(Outbound::Close).is_err()) {
            debug!(target: WS_TARGET, "connection task already finished");
        }
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsConnection")
            .field("connected", &self.is_connected())
            .field("generation", &self.inner.generation.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// One connect attempt and the stream it produces.
struct Session {
    inner: Arc<Inner>,
    generation: u64,
}

impl Session {
    async fn run(self, url: Url, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
        let stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(source) => {
                self.report(Ending::Failed(WsError::Handshake {
                    url: url.to_string(),
                    source: Box::new(source),
                }));
                return;
            }
        };

        debug!(target: WS_TARGET, %url, "handshake complete");
        if !self.is_current() {
            return;
        }
        self.inner.connected.store(true, Ordering::Release);
        self.emit(|events| events.on_connected());

        let (mut sink, mut source) = stream.split();
        let ending = loop {
            tokio::select! {
                command = outbound.recv() => match command {
                    Some(Outbound::Text(frame)) => {
                        if let Err(error) = sink.send(Message::Text(frame.into())).await {
                            break Ending::Failed(WsError::Stream(Box::new(error)));
                        }
                    }
                    Some(Outbound::Close) | None => break close(&mut sink).await,
                },
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let payload = Payload::Text(text.as_str().to_owned());
                        self.emit(|events| events.on_message(payload));
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        self.emit(|events| events.on_message(Payload::Binary(bytes.to_vec())));
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(error) = sink.send(Message::Pong(data)).await {
                            break Ending::Failed(WsError::Stream(Box::new(error)));
                        }
                    }
                    Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        // Flushes the close reply queued by the protocol layer.
                        if let Err(error) = sink.close().await {
                            debug!(target: WS_TARGET, %error, "close reply not delivered");
                        }
                        break Ending::Closed(close_code(frame.as_ref()));
                    }
                    Some(Err(error)) => break Ending::Failed(WsError::Stream(Box::new(error))),
                    None => break Ending::Closed(CloseCode::ABNORMAL),
                },
            }
        };
        self.report(ending);
    }

    fn is_current(&self) -> bool {
        self.inner.generation.load(Ordering::Acquire) == self.generation
    }

    fn emit(&self, deliver: impl FnOnce(&dyn ConnectionEvents)) {
        if !self.is_current() {
            return;
        }
        let events = lock(&self.inner.events).clone();
        if let Some(events) = events {
            deliver(events.as_ref());
        }
    }

    fn report(&self, ending: Ending) {
        if !self.is_current() {
            debug!(target: WS_TARGET, generation = self.generation, "superseded task finished");
            return;
        }
        self.inner.connected.store(false, Ordering::Release);
        match ending {
            Ending::Closed(code) => {
                debug!(target: WS_TARGET, %code, "connection closed");
                self.emit(|events| events.on_disconnected(code));
            }
            Ending::Failed(error) => {
                warn!(target: WS_TARGET, %error, "connection failed");
                self.emit(|events| events.on_error(TransportFailure::new(error.to_string())));
            }
        }
    }
}

/// Sends a normal close frame.
async fn close(sink: &mut WsSink) -> Ending {
    let frame = CloseFrame {
        code: FrameCloseCode::Normal,
        reason: String::new().into(),
    };
    match sink.send(Message::Close(Some(frame))).await {
        Ok(()) => Ending::Closed(CloseCode::NORMAL),
        Err(error) => Ending::Failed(WsError::Stream(Box::new(error))),
    }
}

fn close_code(frame: Option<&CloseFrame>) -> CloseCode {
    frame.map_or(CloseCode::NO_STATUS, |frame| CloseCode(u16::from(frame.code)))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}
