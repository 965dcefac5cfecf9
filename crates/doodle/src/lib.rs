//! # Doodle
//!
//! A real-time multiplayer drawing-and-guessing game server.
//!
//! Players connect over WebSocket, create or join a room by code, and take
//! turns drawing a secret word while everyone else guesses. Each room is an
//! actor task that owns its game; this crate wires transport, protocol,
//! sessions and rooms together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doodle::prelude::*;
//!
//! # async fn run() -> Result<(), DoodleError> {
//! let server = DoodleServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(GuestAuthenticator, LogHandler)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod connection;
mod error;
mod handler;
mod server;
mod telemetry;

pub use connection::MAX_LIST_COUNT;
pub use error::DoodleError;
pub use handler::LogHandler;
pub use server::{DoodleServer, DoodleServerBuilder, ServerConfig, DEFAULT_BIND};
pub use telemetry::Telemetry;

/// Everything needed to run a server or write a client-side test.
pub mod prelude {
    pub use crate::{
        DoodleError, DoodleServer, DoodleServerBuilder, LogHandler, ServerConfig, Telemetry,
        DEFAULT_BIND,
    };
    pub use doodle_protocol::{
        BeginMsg, ChatMsg, Circle, Codec, EndMsg, Inbound, JsonCodec, Outbound, Phase, Player,
        PlayerId, RoomCode, RoomSettings, ScoreMsg,
    };
    pub use doodle_room::{Broker, Handler, NoopHandler, RoomHandle};
    pub use doodle_session::{Authenticator, GuestAuthenticator, SessionError};
}
