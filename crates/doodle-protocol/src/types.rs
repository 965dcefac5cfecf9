//! Core protocol types for Doodle's wire format.
//!
//! These are the structures that get serialized into the `msg` half of an
//! envelope: player identities, strokes, room settings, and the snapshots
//! the server hands out. Field names follow the JavaScript client, so most
//! structs use `#[serde(rename_all = "camelCase")]`.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Newtype over `u64` so a player id can't be confused with an index into
/// the player list (both are integers on the wire). `#[serde(transparent)]`
/// keeps the JSON a plain number: `PlayerId(42)` is just `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type in to find a room (e.g. `"123abc"`).
///
/// Codes are the Broker's keys, so they are compared byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

/// A participant in a room.
///
/// The connection a player talks through belongs to the transport layer;
/// this record is what the game state owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub score: u32,
}

impl Player {
    /// A fresh player with a zero score.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            score: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Strokes
// ---------------------------------------------------------------------------

/// One stroke on the canvas: a filled circle.
///
/// `connected` marks the circle as a continuation of the previous one, so
/// the client draws a line between them instead of a lone dot. Only `x`
/// and `y` are required; the rest default to zero/false the way browsers
/// tend to omit them.
///
/// The integer widths are part of the protocol: `x: 70000` fails to decode
/// instead of being silently truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    pub x: u16,
    pub y: u16,
    #[serde(default)]
    pub color: u8,
    #[serde(default)]
    pub radius: u8,
    #[serde(default)]
    pub connected: bool,
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound message.
///
/// Game state returns `(Recipient, Outbound)` pairs; the room actor
/// resolves them against its live connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// A named subset, e.g. everyone who already knows the word.
    Players(Vec<PlayerId>),
    /// Everyone except one player.
    AllExcept(PlayerId),
}

impl Recipient {
    /// Returns `true` if `player` is addressed by this recipient.
    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(id) => *id == player,
            Self::Players(ids) => ids.contains(&player),
            Self::AllExcept(id) => *id != player,
        }
    }
}

// ---------------------------------------------------------------------------
// Room settings and phase
// ---------------------------------------------------------------------------

/// Per-room settings, fixed when the room is created.
///
/// Every field is optional on the wire; zero/empty values are replaced with
/// defaults before a room is built (see `doodle_game::settings`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomSettings {
    /// Words the drawer can be asked to draw.
    pub word_bank: Vec<String>,
    /// How many times every player draws.
    pub rounds: u32,
    /// Seconds each turn lasts before it is force-ended.
    pub time_limit_secs: u64,
    /// Maximum number of players.
    pub capacity: usize,
}

/// Where a room's game is in its lifecycle.
///
/// ```text
/// Lobby ──(start, ≥2 players)──→ Playing ──(last turn / <2 players)──→ Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lobby,
    Playing,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Playing => write!(f, "Playing"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshots and results
// ---------------------------------------------------------------------------

/// Everything a newly joined client needs to render the room.
///
/// `word` is masked unless the viewer is allowed to know it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub phase: Phase,
    pub players: Vec<Player>,
    pub round: u32,
    pub rounds: u32,
    pub drawer_index: Option<usize>,
    pub word: String,
    pub canvas: Vec<Circle>,
    pub time_limit_secs: u64,
    pub elapsed_secs: u64,
}

/// One line of the final scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameResult {
    pub player: PlayerId,
    pub name: String,
    pub score: u32,
    /// 1-based; tied scores share a rank.
    pub rank: usize,
}
