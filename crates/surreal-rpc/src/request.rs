//! Outgoing request envelopes.

use serde::Serialize;
use serde_json::Value;

use crate::error::RpcError;

/// Positional parameters of a request.
///
/// Parameters always serialise as a JSON array, even when there is only one.
/// An empty parameter list is omitted from the envelope entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(Vec<Value>);

impl Params {
    /// Creates an empty parameter list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Encode`] when the value cannot be serialised.
    pub fn push<T: Serialize>(&mut self, value: &T) -> Result<(), RpcError> {
        self.0.push(serde_json::to_value(value)?);
        Ok(())
    }

    /// Returns the list with `value` appended.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Encode`] when the value cannot be serialised.
    pub fn with<T: Serialize>(mut self, value: &T) -> Result<Self, RpcError> {
        self.push(value)?;
        Ok(self)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

/// A request envelope, serialised as a single text frame.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Identifier echoed back in the matching response.
    pub id: u64,
    /// Name of the remote method.
    pub method: String,
    /// Positional parameters.
    #[serde(skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

impl Request {
    /// Creates a request envelope.
    #[must_use]
    pub fn new(id: u64, method: impl Into<String>, params: Params) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Renders the envelope as JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Encode`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, RpcError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn rendered(request: &Request) -> Value {
        let text = request.to_json().expect("request should serialise");
        serde_json::from_str(&text).expect("request should be valid JSON")
    }

    #[rstest]
    fn omits_params_when_there_are_none() {
        let request = Request::new(7, "ping", Params::new());

        assert_eq!(rendered(&request), json!({"id": 7, "method": "ping"}));
    }

    #[rstest]
    fn single_parameter_is_still_an_array() {
        let params = Params::new()
            .with(&json!({"user": "root", "pass": "root"}))
            .expect("params should encode");
        let request = Request::new(1, "signin", params);

        assert_eq!(
            rendered(&request),
            json!({"id": 1, "method": "signin", "params": [{"user": "root", "pass": "root"}]})
        );
    }

    #[rstest]
    fn parameters_keep_their_order() {
        let params = Params::new()
            .with(&"test_ns")
            .and_then(|params| params.with(&"test_db"))
            .expect("params should encode");
        let request = Request::new(2, "use", params);

        assert_eq!(
            rendered(&request),
            json!({"id": 2, "method": "use", "params": ["test_ns", "test_db"]})
        );
    }

    #[rstest]
    fn maximum_id_serialises_exactly() {
        let request = Request::new(u64::MAX, "version", Params::new());

        let text = request.to_json().expect("request should serialise");

        assert!(text.contains(&u64::MAX.to_string()));
    }
}
