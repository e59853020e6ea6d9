//! High-level database client built on [`RpcSocket`].

use tokio::sync::Mutex;
use url::Url;

use crate::connection::Connection;
use crate::error::RpcError;
use crate::method::{Ping, Signin, Use, Version};
use crate::socket::RpcSocket;

/// Namespace and database a connection operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatabaseIdentifier {
    /// Namespace name.
    pub namespace: String,
    /// Database name within the namespace.
    pub database: String,
}

impl DatabaseIdentifier {
    /// Creates an identifier.
    #[must_use]
    pub fn new(namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            database: database.into(),
        }
    }
}

/// A connected database session.
///
/// Wraps an [`RpcSocket`] and remembers which database the session has
/// selected.
pub struct SurrealClient<C: Connection> {
    socket: RpcSocket<C>,
    database: Mutex<Option<DatabaseIdentifier>>,
}

impl<C: Connection> SurrealClient<C> {
    /// Connects over `connection` and optionally selects a database.
    ///
    /// # Errors
    ///
    /// Returns the connect failure, or the failure of the `use` request when
    /// an identifier is supplied.
    pub async fn connect(
        connection: C,
        url: &Url,
        identifier: Option<DatabaseIdentifier>,
    ) -> Result<Self, RpcError> {
        let socket = RpcSocket::new(connection);
        socket.connect(url).await?;

        let client = Self {
            socket,
            database: Mutex::new(None),
        };
        if let Some(identifier) = identifier {
            client.use_database(identifier).await?;
        }
        Ok(client)
    }

    /// Selects the namespace and database for subsequent queries.
    ///
    /// The selection is recorded only once the server accepts it. Concurrent
    /// selections are applied one at a time.
    ///
    /// # Errors
    ///
    /// Returns the failure of the `use` request.
    pub async fn use_database(&self, identifier: DatabaseIdentifier) -> Result<(), RpcError> {
        let mut selected = self.database.lock().await;
        self.socket.request_void(&Use::new(&identifier)).await?;
        *selected = Some(identifier);
        Ok(())
    }

    /// The database most recently selected.
    pub async fn database(&self) -> Option<DatabaseIdentifier> {
        self.database.lock().await.clone()
    }

    /// Authenticates the session.
    ///
    /// # Errors
    ///
    /// Returns the failure of the `signin` request.
    pub async fn signin(&self, username: &str, password: &str) -> Result<(), RpcError> {
        self.socket.request_void(&Signin::new(username, password)).await
    }

    /// Returns the server version string.
    ///
    /// # Errors
    ///
    /// Returns the failure of the `version` request.
    pub async fn version(&self) -> Result<String, RpcError> {
        self.socket.request(&Version).await
    }

    /// Checks that the server responds.
    ///
    /// # Errors
    ///
    /// Returns the failure of the `ping` request.
    pub async fn ping(&self) -> Result<(), RpcError> {
        self.socket.request_void(&Ping).await
    }

    /// The underlying multiplexer, for methods without a typed wrapper.
    #[must_use]
    pub const fn socket(&self) -> &RpcSocket<C> {
        &self.socket
    }

    /// Closes the connection.
    pub fn disconnect(&self) {
        self.socket.disconnect_now();
    }
}
