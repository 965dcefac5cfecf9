//! Room [`Handler`] that writes what rooms report to the log.

use doodle_game::Snapshot;
use doodle_protocol::{GameResult, RoomCode};
use doodle_room::Handler;

/// Logs terminations, final scoreboards and captured drawings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogHandler;

impl Handler for LogHandler {
    fn on_termination(&self, room: &RoomCode) {
        tracing::info!(%room, "room terminated");
    }

    fn do_shutdown(&self, room: &RoomCode, results: Vec<GameResult>) {
        match results.first() {
            Some(winner) => tracing::info!(
                %room,
                players = results.len(),
                winner = %winner.name,
                score = winner.score,
                "final results"
            ),
            None => tracing::info!(%room, "room closed with no players"),
        }
        for result in &results {
            tracing::debug!(
                %room,
                rank = result.rank,
                player = %result.player,
                score = result.score,
                "result"
            );
        }
    }

    fn do_capture(&self, snapshot: Snapshot) {
        tracing::info!(
            room = %snapshot.room,
            word = %snapshot.word,
            bytes = snapshot.drawing.signature.len(),
            "drawing captured"
        );
    }
}
