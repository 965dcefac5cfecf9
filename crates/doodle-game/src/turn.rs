//! The turn model: one drawer, one secret word, one canvas.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use doodle_protocol::{Circle, PlayerId};

use crate::GameError;

/// Points credited per correct guesser.
pub const GUESS_REWARD: u32 = 50;

/// An encoded, read-only copy of a canvas.
///
/// The signature is the stroke list in bincode's standard encoding, so
/// [`Drawing::strokes`] gives back exactly what was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawing {
    pub signature: Vec<u8>,
}

impl Drawing {
    /// Decodes the signature back into strokes, in drawing order.
    ///
    /// # Errors
    /// Returns [`GameError::Serialization`] if the signature is corrupt.
    pub fn strokes(&self) -> Result<Vec<Circle>, GameError> {
        let (strokes, _): (Vec<Circle>, _) =
            bincode::serde::decode_from_slice(&self.signature, bincode::config::standard())
                .map_err(|e| GameError::Serialization(e.to_string()))?;
        Ok(strokes)
    }
}

/// State of the turn currently being played.
///
/// The canvas is append-only between clears. The guesser set is a set, so
/// marking the same player twice never counts twice.
#[derive(Debug, Clone)]
pub struct GameTurn {
    curr_word: String,
    drawer: Option<usize>,
    canvas: Vec<Circle>,
    guessers: HashSet<PlayerId>,
    started_at: Instant,
}

impl GameTurn {
    /// Empty canvas, no word, no drawer, nobody has guessed.
    pub fn new(now: Instant) -> Self {
        Self {
            curr_word: String::new(),
            drawer: None,
            canvas: Vec::new(),
            guessers: HashSet::new(),
            started_at: now,
        }
    }

    /// Starts a fresh turn for `drawer` with `word`.
    pub fn begin(&mut self, word: String, drawer: usize, now: Instant) {
        self.clear_canvas();
        self.clear_guessers();
        self.reset_start_time(now);
        self.curr_word = word;
        self.drawer = Some(drawer);
    }

    /// Back to the no-turn state (used once the game is over).
    pub fn close(&mut self) {
        self.curr_word.clear();
        self.drawer = None;
        self.clear_guessers();
    }

    pub fn clear_guessers(&mut self) {
        self.guessers.clear();
    }

    pub fn clear_canvas(&mut self) {
        self.canvas.clear();
    }

    pub fn reset_start_time(&mut self, now: Instant) {
        self.started_at = now;
    }

    /// Appends a stroke.
    ///
    /// The caller is responsible for checking the stroke came from the
    /// drawer; this only checks that a turn is running.
    ///
    /// # Errors
    /// Returns [`GameError::NoActiveTurn`] before a word has been chosen.
    pub fn draw(&mut self, stroke: Circle) -> Result<(), GameError> {
        if !self.is_active() {
            return Err(GameError::NoActiveTurn);
        }
        self.canvas.push(stroke);
        Ok(())
    }

    /// Marks `player` as having guessed. Returns `false` if they already had.
    pub fn set_guesser(&mut self, player: PlayerId) -> bool {
        self.guessers.insert(player)
    }

    pub fn remove_guesser(&mut self, player: PlayerId) {
        self.guessers.remove(&player);
    }

    pub fn has_guessed(&self, player: PlayerId) -> bool {
        self.guessers.contains(&player)
    }

    pub fn guessers(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.guessers.iter().copied()
    }

    pub fn guesser_count(&self) -> usize {
        self.guessers.len()
    }

    /// Points this turn is worth when it ends: a flat reward per guesser.
    pub fn calc_reset_score(&self) -> u32 {
        self.guessers.len() as u32 * GUESS_REWARD
    }

    /// `true` if any whitespace-separated token of `text` equals the current
    /// word exactly. `"Words"` does not match `"Word"`, and neither does
    /// `"word"`.
    pub fn contains_curr_word(&self, text: &str) -> bool {
        !self.curr_word.is_empty() && text.split_whitespace().any(|token| token == self.curr_word)
    }

    /// Encodes the canvas into a [`Drawing`].
    ///
    /// # Errors
    /// Returns [`GameError::Serialization`] if encoding fails.
    pub fn capture_drawing(&self) -> Result<Drawing, GameError> {
        let signature = bincode::serde::encode_to_vec(&self.canvas, bincode::config::standard())
            .map_err(|e| GameError::Serialization(e.to_string()))?;
        Ok(Drawing { signature })
    }

    pub fn is_active(&self) -> bool {
        self.drawer.is_some() && !self.curr_word.is_empty()
    }

    pub fn curr_word(&self) -> &str {
        &self.curr_word
    }

    pub fn drawer(&self) -> Option<usize> {
        self.drawer
    }

    /// Re-points the drawer after the player list shifted.
    pub(crate) fn set_drawer(&mut self, drawer: usize) {
        self.drawer = Some(drawer);
    }

    pub fn canvas(&self) -> &[Circle] {
        &self.canvas
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }
}

impl Default for GameTurn {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}
