//! Game rules for Doodle.
//!
//! [`GameTurn`] is a single turn: the secret word, the drawer, the canvas
//! and who has guessed. [`GameState`] strings turns together into rounds
//! and decides who hears what. Neither knows about sockets or tasks; the
//! room actor drives them and delivers the [`Dispatch`] they return.

mod error;
pub mod settings;
mod state;
mod turn;

pub use error::GameError;
pub use state::{mask_word, Dispatch, GameState, Snapshot, MAX_CHAT_LEN};
pub use turn::{Drawing, GameTurn, GUESS_REWARD};
