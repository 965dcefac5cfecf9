//! Doodle game server binary.
//!
//! Environment:
//! - `DOODLE_BIND`: listen address (default `127.0.0.1:8080`)
//! - `RUST_LOG`: log filter (default `info`)

use std::time::Duration;

use doodle::prelude::*;
use tracing_subscriber::EnvFilter;

/// How long rooms get to drain on Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<(), DoodleError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind = std::env::var("DOODLE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let server = DoodleServerBuilder::new()
        .bind(&bind)
        .build(GuestAuthenticator, LogHandler)
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    let mut clients = server.telemetry().subscribe().await;
    tokio::spawn(async move {
        while let Some(count) = clients.recv().await {
            tracing::info!(clients = count, "client count changed");
        }
    });

    let broker = server.broker();
    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            let rooms = broker.shutdown_all().await;
            tracing::info!(rooms, "shutting down");
            let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
                while !broker.is_empty().await {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            })
            .await;
            if drained.is_err() {
                tracing::warn!(remaining = broker.len().await, "rooms still running at exit");
            }
            Ok(())
        }
    }
}
