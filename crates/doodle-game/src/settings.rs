//! Room settings defaulting.
//!
//! Clients may send partial settings when they create a room. Everything
//! downstream assumes settings are complete and sane, so they pass through
//! [`with_defaults`] exactly once, at creation.

use std::time::Duration;

use doodle_protocol::RoomSettings;

/// Minimum players required to start a game.
pub const MIN_PLAYERS: usize = 2;

pub const DEFAULT_ROUNDS: u32 = 3;
pub const MAX_ROUNDS: u32 = 20;
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 60;
pub const MAX_TIME_LIMIT_SECS: u64 = 600;
pub const DEFAULT_CAPACITY: usize = 8;
pub const MAX_CAPACITY: usize = 32;

/// Used when a room is created without a word bank.
pub const DEFAULT_WORD_BANK: &[&str] = &[
    "apple", "bicycle", "castle", "dragon", "elephant", "guitar", "house",
    "island", "kite", "lighthouse", "mountain", "octopus", "penguin",
    "rainbow", "snowman", "tree", "umbrella", "volcano", "whale", "zebra",
];

/// Fills in missing values and clamps the rest into range.
///
/// Word bank entries are trimmed. Entries that are empty or contain
/// whitespace are dropped: guesses are matched token by token, so a
/// multi-word entry could never be guessed.
pub fn with_defaults(mut settings: RoomSettings) -> RoomSettings {
    let before = settings.word_bank.len();
    settings.word_bank = settings
        .word_bank
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty() && !w.contains(char::is_whitespace))
        .collect();
    if settings.word_bank.len() < before {
        tracing::warn!(
            dropped = before - settings.word_bank.len(),
            "dropped unusable word bank entries"
        );
    }
    if settings.word_bank.is_empty() {
        settings.word_bank = DEFAULT_WORD_BANK.iter().map(|w| w.to_string()).collect();
    }

    settings.rounds = match settings.rounds {
        0 => DEFAULT_ROUNDS,
        n => n.min(MAX_ROUNDS),
    };
    settings.time_limit_secs = match settings.time_limit_secs {
        0 => DEFAULT_TIME_LIMIT_SECS,
        n => n.min(MAX_TIME_LIMIT_SECS),
    };
    settings.capacity = match settings.capacity {
        0 => DEFAULT_CAPACITY,
        n => n.clamp(MIN_PLAYERS, MAX_CAPACITY),
    };
    settings
}

/// The per-turn time limit.
pub fn time_limit(settings: &RoomSettings) -> Duration {
    Duration::from_secs(settings.time_limit_secs)
}
