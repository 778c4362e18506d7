//! `DuelforgeServer` builder and accept loop.
//!
//! This is the entry point for running a Duelforge server. It ties the
//! layers together: transport → protocol → coordinator → session.

use std::sync::Arc;

use duelforge_coordinator::{Coordinator, CoordinatorConfig};
use duelforge_protocol::{Codec, JsonCodec};
use duelforge_session::Authenticator;
use duelforge_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{DuelforgeError, ServerConfig};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<A: Authenticator, C: Codec> {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Duelforge server.
///
/// # Example
///
/// ```rust,ignore
/// use duelforge::prelude::*;
///
/// let server = DuelforgeServerBuilder::new()
///     .bind("0.0.0.0:3000")
///     .build(my_auth)
///     .await?;
/// server.run().await
/// ```
pub struct DuelforgeServerBuilder {
    bind_addr: String,
    config: ServerConfig,
    coordinator_config: CoordinatorConfig,
}

impl DuelforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            config: ServerConfig::default(),
            coordinator_config: CoordinatorConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the connection timeouts.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the coordinator configuration.
    pub fn coordinator_config(mut self, config: CoordinatorConfig) -> Self {
        self.coordinator_config = config;
        self
    }

    /// Binds the listener and assembles the server with the given
    /// authenticator. Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// - [`DuelforgeError::Config`] if the coordinator settings are invalid
    /// - [`DuelforgeError::Transport`] if the address can't be bound
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<DuelforgeServer<A, JsonCodec>, DuelforgeError> {
        self.coordinator_config.validate()?;
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            coordinator: Arc::new(Coordinator::new(self.coordinator_config)),
            auth,
            codec: JsonCodec,
            config: self.config,
        });

        Ok(DuelforgeServer { transport, state })
    }
}

impl Default for DuelforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Duelforge server bound to its listening address.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DuelforgeServer<A: Authenticator, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl<A, C> DuelforgeServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Creates a new builder.
    pub fn builder() -> DuelforgeServerBuilder {
        DuelforgeServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns a handle to the coordinator, e.g. for inspecting open
    /// sessions from the embedding application.
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.state.coordinator)
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection gets its own handler task. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), DuelforgeError> {
        tracing::info!("Duelforge server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
