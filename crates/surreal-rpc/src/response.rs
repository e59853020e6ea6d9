//! Parsing of inbound response envelopes.

use serde_json::{Map, Value};

/// What the server answered for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The request succeeded with the given JSON payload.
    Result(Value),
    /// The request failed on the server.
    Error {
        /// Error code chosen by the server.
        code: i64,
        /// Error message chosen by the server.
        message: String,
    },
}

/// A parsed response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    request_id: u64,
    outcome: Outcome,
}

impl Response {
    /// Creates a response for the given request.
    #[must_use]
    pub const fn new(request_id: u64, outcome: Outcome) -> Self {
        Self {
            request_id,
            outcome,
        }
    }

    /// Parses a response envelope.
    ///
    /// Accepts either `{"id": <u64>, "result": <json>}` or
    /// `{"id": <u64>, "error": {"code": <int>, "message": "<string>"}}`.
    /// Returns `None` for anything else: malformed JSON, a missing or
    /// non-integer ID, both or neither of `result` and `error`, or an error
    /// object without an integer code and string message.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let Value::Object(mut envelope) = serde_json::from_str::<Value>(text).ok()? else {
            return None;
        };

        let request_id = envelope.get("id")?.as_u64()?;
        let outcome = match (envelope.remove("result"), envelope.remove("error")) {
            (Some(payload), None) => Outcome::Result(payload),
            (None, Some(Value::Object(error))) => parse_error(&error)?,
            _ => return None,
        };

        Some(Self::new(request_id, outcome))
    }

    /// ID of the request this response answers.
    #[must_use]
    pub const fn request_id(&self) -> u64 {
        self.request_id
    }

    /// The server's answer.
    #[must_use]
    pub const fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Consumes the response, returning the server's answer.
    #[must_use]
    pub fn into_outcome(self) -> Outcome {
        self.outcome
    }
}

fn parse_error(error: &Map<String, Value>) -> Option<Outcome> {
    let code = error.get("code")?.as_i64()?;
    let message = error.get("message")?.as_str()?.to_owned();
    Some(Outcome::Error { code, message })
}
