//! Typed catalogue of the RPC methods the client issues itself.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::client::DatabaseIdentifier;
use crate::error::RpcError;
use crate::request::Params;

/// A remote method with a statically known name and result type.
pub trait RpcMethod {
    /// Shape of a successful result. Methods without content use [`Null`].
    type Output: DeserializeOwned;

    /// Wire name of the method.
    const NAME: &'static str;

    /// Positional parameters of this invocation.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Encode`] when a parameter cannot be serialised.
    fn params(&self) -> Result<Params, RpcError> {
        Ok(Params::new())
    }
}

/// The JSON `null` result of methods that return no content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Null;

impl Serialize for Null {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de> Deserialize<'de> for Null {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <()>::deserialize(deserializer).map(|()| Self)
    }
}

/// `ping`: checks that the server is responsive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ping;

impl RpcMethod for Ping {
    type Output = Null;
    const NAME: &'static str = "ping";
}

/// `version`: reports the server version string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Version;

impl RpcMethod for Version {
    type Output = String;
    const NAME: &'static str = "version";
}

/// `use`: selects the namespace and database for the connection.
#[derive(Debug, Clone)]
pub struct Use<'a> {
    identifier: &'a DatabaseIdentifier,
}

impl<'a> Use<'a> {
    /// Selects the given database.
    #[must_use]
    pub const fn new(identifier: &'a DatabaseIdentifier) -> Self {
        Self { identifier }
    }
}

impl RpcMethod for Use<'_> {
    type Output = Null;
    const NAME: &'static str = "use";

    fn params(&self) -> Result<Params, RpcError> {
        Params::new()
            .with(&self.identifier.namespace)?
            .with(&self.identifier.database)
    }
}

/// `signin`: authenticates the connection with user credentials.
#[derive(Clone)]
pub struct Signin<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> Signin<'a> {
    /// Signs in with the given credentials.
    #[must_use]
    pub const fn new(username: &'a str, password: &'a str) -> Self {
        Self { username, password }
    }
}

impl std::fmt::Debug for Signin<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    user: &'a str,
    pass: &'a str,
}

impl RpcMethod for Signin<'_> {
    type Output = Null;
    const NAME: &'static str = "signin";

    fn params(&self) -> Result<Params, RpcError> {
        Params::new().with(&Credentials {
            user: self.username,
            pass: self.password,
        })
    }
}
