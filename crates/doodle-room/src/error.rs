//! Error types for the room layer.

use doodle_game::GameError;
use doodle_protocol::{ProtocolError, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room's event queue is closed: it has terminated or is shutting down.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),

    /// The game refused the action.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The envelope isn't something a room handles.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl RoomError {
    /// Status code for the `error` envelope sent back to the client.
    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Unavailable(_) => 503,
            Self::Game(e) => e.status(),
            Self::Protocol(e) => e.status(),
        }
    }
}
