//! Error types for the game layer.

use doodle_protocol::PlayerId;

/// Why the game state refused an action.
///
/// Every variant is recoverable: the offending event is dropped, the state
/// is left untouched, and the error is reported to whoever sent it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    // -- Capacity / phase (joining) --
    /// No free player slots left.
    #[error("room is full ({capacity} players)")]
    RoomFull { capacity: usize },

    /// Joins are only accepted in the lobby.
    #[error("game already in progress")]
    GameInProgress,

    /// The same player id is already in the room.
    #[error("player {0} already joined")]
    AlreadyJoined(PlayerId),

    // -- Validation --
    #[error("need at least {required} players to start, have {present}")]
    NotEnoughPlayers { required: usize, present: usize },

    #[error("word bank is empty")]
    EmptyWordBank,

    #[error("game already started")]
    AlreadyStarted,

    #[error("game is not being played")]
    NotPlaying,

    #[error("only the drawer can draw")]
    NotDrawer(PlayerId),

    #[error("the drawer can't say the word")]
    DrawerCannotGuess,

    #[error("no turn is active")]
    NoActiveTurn,

    #[error("player {0} is not in this room")]
    UnknownPlayer(PlayerId),

    #[error("invalid text: {0}")]
    InvalidText(String),

    // -- Capture --
    /// Encoding the canvas failed.
    #[error("failed to capture the drawing: {0}")]
    Serialization(String),
}

impl GameError {
    /// `true` for capacity/phase rejections of a join.
    pub fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::RoomFull { .. } | Self::GameInProgress | Self::AlreadyJoined(_)
        )
    }

    /// HTTP-style status reported to the client.
    pub fn status(&self) -> u16 {
        match self {
            Self::RoomFull { .. } | Self::GameInProgress | Self::AlreadyJoined(_) => 409,
            Self::Serialization(_) => 500,
            _ => 400,
        }
    }
}
