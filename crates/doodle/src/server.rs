//! `DoodleServer` builder and server loop.
//!
//! This is the entry point for running a Doodle server. It ties together
//! all the layers: transport → protocol → session → room.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use doodle_protocol::{Codec, JsonCodec};
use doodle_room::{Broker, Handler};
use doodle_session::Authenticator;
use doodle_transport::{Connection, Transport, WebSocketTransport};

use crate::connection::handle_connection;
use crate::{DoodleError, Telemetry};

/// Address used when nothing else is configured.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server-wide settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// How long a new connection has to send its first envelope.
    pub handshake_timeout: Duration,
    /// Connections with no traffic in either direction for this long are
    /// closed.
    pub idle_timeout: Duration,
    /// Rejected envelopes tolerated before the connection is closed.
    pub max_protocol_violations: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_protocol_violations: 16,
        }
    }
}

/// Shared server state passed to each connection task.
pub(crate) struct ServerState<A: Authenticator, H: Handler, C: Codec> {
    pub(crate) broker: Broker,
    pub(crate) auth: A,
    pub(crate) handler: Arc<H>,
    pub(crate) codec: C,
    pub(crate) telemetry: Telemetry,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Doodle server.
///
/// # Example
///
/// ```rust,no_run
/// use doodle::prelude::*;
///
/// # async fn run() -> Result<(), DoodleError> {
/// let server = DoodleServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(GuestAuthenticator, LogHandler)
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DoodleServerBuilder {
    config: ServerConfig,
}

impl DoodleServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn max_protocol_violations(mut self, max: u32) -> Self {
        self.config.max_protocol_violations = max;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener. Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A: Authenticator, H: Handler>(
        self,
        auth: A,
        handler: H,
    ) -> Result<DoodleServer<A, H, JsonCodec>, DoodleError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let state = Arc::new(ServerState {
            broker: Broker::new(),
            auth,
            handler: Arc::new(handler),
            codec: JsonCodec,
            telemetry: Telemetry::new(),
            config: self.config,
        });

        Ok(DoodleServer { transport, state })
    }
}

/// A bound Doodle server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct DoodleServer<A: Authenticator, H: Handler, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, H, C>>,
}

impl<A, H, C> DoodleServer<A, H, C>
where
    A: Authenticator,
    H: Handler,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, DoodleError> {
        Ok(self.transport.local_addr()?)
    }

    /// The room registry, shared with every connection.
    pub fn broker(&self) -> Broker {
        self.state.broker.clone()
    }

    pub fn telemetry(&self) -> Telemetry {
        self.state.telemetry.clone()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// Each accepted connection gets its own task.
    pub async fn run(mut self) -> Result<(), DoodleError> {
        tracing::info!("Doodle server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let conn_id = conn.id();
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(%conn_id, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}
