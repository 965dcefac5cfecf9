//! Hooks a room calls into when it shuts down.

use doodle_game::Snapshot;
use doodle_protocol::{GameResult, RoomCode};

/// Collaborator injected into every room at creation.
///
/// Methods run on the room's own task, so they should return quickly;
/// anything that does I/O belongs in a spawned task. All methods default to
/// doing nothing.
pub trait Handler: Send + Sync + 'static {
    /// The room's loop has stopped accepting events.
    fn on_termination(&self, room: &RoomCode) {
        let _ = room;
    }

    /// Final ranked scoreboard, called once per room.
    fn do_shutdown(&self, room: &RoomCode, results: Vec<GameResult>) {
        let _ = (room, results);
    }

    /// A finished drawing. Called after every turn that had strokes, and
    /// once more at termination if a turn was cut short.
    fn do_capture(&self, snapshot: Snapshot) {
        let _ = snapshot;
    }
}

/// A [`Handler`] that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl Handler for NoopHandler {}
