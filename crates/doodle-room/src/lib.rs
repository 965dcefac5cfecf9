//! Rooms for Doodle.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! [`GameState`](doodle_game::GameState). Nothing outside the task touches
//! the game; callers go through a [`RoomHandle`].
//!
//! # Key types
//!
//! - [`Broker`]: registry from room code to [`RoomHandle`]; creates rooms
//! - [`RoomHandle`]: join, leave and enqueue messages on a running room
//! - [`Handler`]: hooks called when a room shuts down
//! - [`RoomError`]: what can go wrong talking to a room

mod broker;
mod error;
mod handler;
mod room;

pub use broker::{Broker, CODE_LEN};
pub use error::RoomError;
pub use handler::{Handler, NoopHandler};
pub use room::{player_channel, spawn_room, PlayerSender, RoomHandle, RoomInfo, PLAYER_QUEUE_LEN};
