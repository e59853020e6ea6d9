//! The duplex message channel the multiplexer runs over.
//!
//! A [`Connection`] owns everything below the message layer: the handshake,
//! keep-alives, and framing. It reports what happens on the wire through the
//! [`ConnectionEvents`] handler registered with it, typically from an I/O
//! task the caller does not control.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

/// Shared handle to the receiver of connection events.
pub type EventHandler = Arc<dyn ConnectionEvents>;

/// A duplex text-message channel to the database server.
///
/// Every method returns immediately; outcomes are reported asynchronously
/// through the registered [`ConnectionEvents`].
pub trait Connection: Send + Sync + 'static {
    /// Installs the receiver for connection events.
    ///
    /// Called once, before any other method.
    fn register(&self, events: EventHandler);

    /// Starts connecting to `url`.
    ///
    /// Completion is reported through [`ConnectionEvents::on_connected`] or
    /// [`ConnectionEvents::on_error`].
    fn connect(&self, url: &Url);

    /// Queues a text frame for transmission.
    fn send(&self, frame: String);

    /// Starts closing the connection.
    ///
    /// Completion is reported through [`ConnectionEvents::on_disconnected`].
    fn disconnect(&self);

    /// Whether the channel currently has an open connection.
    fn is_connected(&self) -> bool;
}

/// Callbacks through which a [`Connection`] reports activity.
pub trait ConnectionEvents: Send + Sync {
    /// The connection finished its handshake.
    fn on_connected(&self);

    /// The connection closed.
    fn on_disconnected(&self, code: CloseCode);

    /// The connection failed.
    fn on_error(&self, error: TransportFailure);

    /// A complete message arrived.
    fn on_message(&self, payload: Payload);
}

/// A message delivered by the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A text frame.
    Text(String),
    /// A binary frame, expected to hold UTF-8 text.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the payload as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Binary(bytes) => String::from_utf8(bytes)
                .unwrap_or_else(|error| String::from_utf8_lossy(error.as_bytes()).into_owned()),
        }
    }
}

/// Status code reported when a connection closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Orderly shutdown.
    pub const NORMAL: Self = Self(1000);
    /// The peer is going away.
    pub const GOING_AWAY: Self = Self(1001);
    /// The peer closed without supplying a status.
    pub const NO_STATUS: Self = Self(1005);
    /// The connection dropped without a closing handshake.
    pub const ABNORMAL: Self = Self(1006);

    /// Numeric value of the code.
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<u16> for CloseCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Error reported by a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportFailure {
    message: String,
}

impl TransportFailure {
    /// Creates a failure with the given description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
