//! In-memory connection whose events are injected by the test.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Value, json};
use url::Url;

use super::settle;
use crate::{CloseCode, Connection, EventHandler, Payload, TransportFailure};

/// Connection double that records outbound frames and lets the test play
/// the server's side.
#[derive(Clone, Default)]
pub struct ScriptedConnection {
    shared: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    events: Option<EventHandler>,
    connected: bool,
    connect_on_request: bool,
    connect_urls: Vec<Url>,
    sent: Vec<String>,
    disconnect_calls: usize,
}

impl ScriptedConnection {
    /// Creates a connection whose connects complete only when the test says so.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connection that reports success as soon as it is asked to
    /// connect.
    pub fn auto_connecting() -> Self {
        let connection = Self::new();
        connection.script().connect_on_request = true;
        connection
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.shared
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn events(&self) -> EventHandler {
        self.script()
            .events
            .clone()
            .expect("connection events were never registered")
    }

    /// Reports a completed handshake.
    pub fn complete_connect(&self) {
        self.script().connected = true;
        self.events().on_connected();
    }

    /// Reports that the server closed the connection.
    pub fn close(&self, code: CloseCode) {
        self.script().connected = false;
        self.events().on_disconnected(code);
    }

    /// Reports a transport failure.
    pub fn fail(&self, message: &str) {
        self.events().on_error(TransportFailure::new(message));
    }

    /// Delivers a text frame.
    pub fn deliver(&self, frame: &str) {
        self.events().on_message(Payload::Text(frame.to_owned()));
    }

    /// Delivers a binary frame.
    pub fn deliver_binary(&self, frame: &[u8]) {
        self.events().on_message(Payload::Binary(frame.to_vec()));
    }

    /// Answers request `id` with a result.
    pub fn answer(&self, id: u64, result: &Value) {
        self.deliver(&json!({ "id": id, "result": result }).to_string());
    }

    /// Answers request `id` with an error envelope.
    pub fn answer_error(&self, id: u64, code: i64, message: &str) {
        self.deliver(
            &json!({ "id": id, "error": { "code": code, "message": message } }).to_string(),
        );
    }

    /// Echoes every request's first parameter back as its result, newest
    /// request first.
    pub fn echo_in_reverse(&self, requests: &[Value]) {
        for request in requests.iter().rev() {
            self.answer(request_id(request), &request["params"][0]);
        }
    }

    /// Raw frames sent so far.
    pub fn sent_frames(&self) -> Vec<String> {
        self.script().sent.clone()
    }

    /// Frames sent so far, parsed as JSON.
    pub fn sent_requests(&self) -> Vec<Value> {
        self.sent_frames()
            .iter()
            .map(|frame| serde_json::from_str(frame).expect("sent frame is not JSON"))
            .collect()
    }

    /// URLs passed to `connect`.
    pub fn connect_urls(&self) -> Vec<Url> {
        self.script().connect_urls.clone()
    }

    /// Number of times `disconnect` was called.
    pub fn disconnect_calls(&self) -> usize {
        self.script().disconnect_calls
    }

    /// Waits until at least `count` requests have been sent.
    pub async fn wait_for_requests(&self, count: usize) -> Vec<Value> {
        settle(|| self.script().sent.len() >= count).await;
        self.sent_requests()
    }

    /// Waits until the socket has asked to connect `count` times.
    pub async fn wait_for_connects(&self, count: usize) {
        settle(|| self.script().connect_urls.len() >= count).await;
    }
}

impl Connection for ScriptedConnection {
    fn register(&self, events: EventHandler) {
        self.script().events = Some(events);
    }

    fn connect(&self, url: &Url) {
        let connect_now = {
            let mut script = self.script();
            script.connect_urls.push(url.clone());
            script.connect_on_request
        };
        if connect_now {
            self.complete_connect();
        }
    }

    fn send(&self, frame: String) {
        self.script().sent.push(frame);
    }

    fn disconnect(&self) {
        let was_connected = {
            let mut script = self.script();
            script.disconnect_calls += 1;
            std::mem::replace(&mut script.connected, false)
        };
        if was_connected {
            self.events().on_disconnected(CloseCode::NORMAL);
        }
    }

    fn is_connected(&self) -> bool {
        self.script().connected
    }
}

/// Extracts the ID of a sent request.
pub fn request_id(request: &Value) -> u64 {
    request["id"].as_u64().expect("request has no numeric id")
}
