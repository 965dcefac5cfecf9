//! Unified error type for the Doodle server.

use doodle_game::GameError;
use doodle_protocol::ProtocolError;
use doodle_room::RoomError;
use doodle_session::SessionError;
use doodle_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DoodleError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The token was rejected.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (not found, unavailable, refused).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A game rule was violated.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl DoodleError {
    /// Status code for the `error` envelope sent back to the client.
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport(_) => 500,
            Self::Protocol(e) => e.status(),
            Self::Session(e) => e.status(),
            Self::Room(e) => e.status(),
            Self::Game(e) => e.status(),
        }
    }
}
