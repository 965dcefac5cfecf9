//! Per-connection flow: pick a room, then relay between socket and room.
//!
//! Each accepted connection gets its own Tokio task running this. The flow:
//!   1. Outside a room: answer `list`, handle `join` / `create`
//!   2. Authenticate the token → get a `Player`
//!   3. Join the room → relay envelopes both ways until `leave`, the room
//!      closes, or the socket does
//!   4. Back to step 1
//!
//! A connection that keeps sending envelopes the server rejects is closed
//! once it reaches the configured violation limit. Inside a room, every
//! `error` the room sends back counts.

use std::sync::Arc;
use std::time::Duration;

use doodle_protocol::{
    Codec, CreateMsg, Inbound, JoinMsg, ListMsg, Outbound, PlayerId, ProtocolError, RoomsMsg,
};
use doodle_room::{player_channel, Handler, RoomHandle};
use doodle_session::Authenticator;
use doodle_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::DoodleError;

/// Largest page `list` will return.
pub const MAX_LIST_COUNT: usize = 100;

/// What the caller should do after a room session ends.
enum Flow {
    /// Go back to waiting for `join` / `create` / `list`.
    Lobby,
    /// Close the connection.
    Close,
}

/// Drop guard that counts the connection out of telemetry when the task
/// exits, however it exits.
///
/// `Drop` is synchronous, so the async update runs in a spawned task.
struct TelemetryGuard {
    telemetry: crate::Telemetry,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        let telemetry = self.telemetry.clone();
        tokio::spawn(async move {
            telemetry.client_disconnected().await;
        });
    }
}

/// Counts rejected envelopes for one connection.
struct Violations {
    count: u32,
    max: u32,
}

impl Violations {
    /// Records one. Returns `true` once the limit is reached.
    fn record(&mut self) -> bool {
        self.count += 1;
        self.count >= self.max
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, H, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, H, C>>,
) -> Result<(), DoodleError>
where
    A: Authenticator,
    H: Handler,
    C: Codec,
{
    let conn_id = conn.id();
    let clients = state.telemetry.client_connected().await;
    let _guard = TelemetryGuard {
        telemetry: state.telemetry.clone(),
    };
    tracing::debug!(%conn_id, clients, "handling new connection");

    let mut violations = Violations {
        count: 0,
        max: state.config.max_protocol_violations,
    };
    let mut timeout = state.config.handshake_timeout;

    loop {
        let Some(data) = recv_with_timeout(&conn, timeout).await? else {
            break;
        };
        timeout = state.config.idle_timeout;

        let inbound: Inbound = match state.codec.decode(&data) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
                if reject(&conn, &state, &mut violations, e.status(), &e.to_string()).await? {
                    break;
                }
                continue;
            }
        };

        let flow = match inbound {
            Inbound::List(ListMsg { offset, count }) => {
                let codes = state
                    .broker
                    .codes(offset, count.min(MAX_LIST_COUNT))
                    .await;
                send(&conn, &state.codec, &Outbound::Rooms(RoomsMsg { codes })).await?;
                Flow::Lobby
            }
            Inbound::Join(JoinMsg { room, token }) => match state.broker.get(&room).await {
                Ok(handle) => {
                    enter_room(&conn, &state, handle, token, false, &mut violations).await?
                }
                Err(e) => {
                    refused(&conn, &state, &mut violations, e.status(), &e.to_string()).await?
                }
            },
            Inbound::Create(CreateMsg { settings, token }) => {
                let handle = state
                    .broker
                    .create_room(settings, Arc::clone(&state.handler))
                    .await;
                enter_room(&conn, &state, handle, token, true, &mut violations).await?
            }
            Inbound::Unknown { code, .. } => {
                let e = ProtocolError::UnknownCode(code);
                refused(&conn, &state, &mut violations, e.status(), &e.to_string()).await?
            }
            other => {
                let e = ProtocolError::InvalidMessage(format!(
                    "`{}` requires joining a room first",
                    other.code()
                ));
                refused(&conn, &state, &mut violations, e.status(), &e.to_string()).await?
            }
        };

        if let Flow::Close = flow {
            break;
        }
    }

    tracing::debug!(%conn_id, "connection closed");
    let _ = conn.close().await;
    Ok(())
}

/// Authenticates, joins `room`, and relays until the player is out again.
///
/// `created` marks a room this connection just made; it is shut down again
/// if the creator can't get in.
async fn enter_room<A, H, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, H, C>>,
    room: RoomHandle,
    token: Option<String>,
    created: bool,
    violations: &mut Violations,
) -> Result<Flow, DoodleError>
where
    A: Authenticator,
    H: Handler,
    C: Codec,
{
    let player = match state.auth.authenticate(token.as_deref().unwrap_or("")).await {
        Ok(player) => player,
        Err(e) => {
            if created {
                shutdown_if_empty(&room).await;
            }
            return refused(conn, state, violations, e.status(), &e.to_string()).await;
        }
    };
    let player_id = player.id;

    let (tx, mut rx) = player_channel();
    if let Err(e) = room.join(player, tx).await {
        tracing::debug!(room = %room.code(), %player_id, error = %e, "join refused");
        if created {
            shutdown_if_empty(&room).await;
        }
        return refused(conn, state, violations, e.status(), &e.to_string()).await;
    }
    tracing::info!(room = %room.code(), %player_id, conn_id = %conn.id(), "player entered room");

    let flow = relay(conn, state, &room, player_id, &mut rx, violations).await;

    // No-op if the room already saw a `leave` or has closed.
    let _ = room.leave(player_id);
    flow
}

/// Forwards room output to the socket and socket input to the room.
async fn relay<A, H, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, H, C>>,
    room: &RoomHandle,
    player_id: PlayerId,
    rx: &mut mpsc::Receiver<Outbound>,
    violations: &mut Violations,
) -> Result<Flow, DoodleError>
where
    A: Authenticator,
    H: Handler,
    C: Codec,
{
    loop {
        tokio::select! {
            out = rx.recv() => match out {
                Some(msg) => {
                    send(conn, &state.codec, &msg).await?;
                    // Errors from the room answer this connection's own envelopes.
                    if matches!(msg, Outbound::Error(_)) && violations.record() {
                        tracing::info!(%player_id, count = violations.count, "too many invalid messages");
                        send_error(conn, &state.codec, 400, "too many invalid messages").await?;
                        return Ok(Flow::Close);
                    }
                }
                None => {
                    tracing::info!(room = %room.code(), %player_id, "room closed");
                    return Ok(Flow::Lobby);
                }
            },
            data = recv_with_timeout(conn, state.config.idle_timeout) => {
                let Some(data) = data? else {
                    return Ok(Flow::Close);
                };
                let inbound: Inbound = match state.codec.decode(&data) {
                    Ok(inbound) => inbound,
                    Err(e) => {
                        tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                        if reject(conn, state, violations, e.status(), &e.to_string()).await? {
                            return Ok(Flow::Close);
                        }
                        continue;
                    }
                };

                match inbound {
                    Inbound::Leave => {
                        let _ = room.leave(player_id);
                        tracing::info!(room = %room.code(), %player_id, "player left room");
                        return Ok(Flow::Lobby);
                    }
                    msg => {
                        if room.enqueue(player_id, msg).is_err() {
                            tracing::debug!(room = %room.code(), %player_id, "room gone");
                            return Ok(Flow::Lobby);
                        }
                    }
                }
            }
        }
    }
}

/// Receives one message, treating a timeout like a clean close.
async fn recv_with_timeout(
    conn: &WebSocketConnection,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, DoodleError> {
    match tokio::time::timeout(timeout, conn.recv()).await {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            tracing::info!(conn_id = %conn.id(), "connection timed out");
            Ok(None)
        }
    }
}

/// Sends an error and records a violation. Returns `true` if the
/// connection should now be closed.
async fn reject<A, H, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, H, C>>,
    violations: &mut Violations,
    status: u16,
    desc: &str,
) -> Result<bool, DoodleError>
where
    A: Authenticator,
    H: Handler,
    C: Codec,
{
    send_error(conn, &state.codec, status, desc).await?;
    if violations.record() {
        tracing::info!(conn_id = %conn.id(), count = violations.count, "too many invalid messages");
        send_error(conn, &state.codec, 400, "too many invalid messages").await?;
        return Ok(true);
    }
    Ok(false)
}

/// [`reject`] for a lobby request that failed before reaching a room.
async fn refused<A, H, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<A, H, C>>,
    violations: &mut Violations,
    status: u16,
    desc: &str,
) -> Result<Flow, DoodleError>
where
    A: Authenticator,
    H: Handler,
    C: Codec,
{
    if reject(conn, state, violations, status, desc).await? {
        Ok(Flow::Close)
    } else {
        Ok(Flow::Lobby)
    }
}

/// An empty room never sees a last leave, so it would never terminate.
async fn shutdown_if_empty(room: &RoomHandle) {
    if let Ok(info) = room.info().await {
        if info.player_count == 0 {
            let _ = room.shutdown();
        }
    }
}

async fn send(conn: &WebSocketConnection, codec: &impl Codec, msg: &Outbound) -> Result<(), DoodleError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` envelope to the client.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    status: u16,
    desc: &str,
) -> Result<(), DoodleError> {
    send(conn, codec, &Outbound::error(status, desc)).await
}
