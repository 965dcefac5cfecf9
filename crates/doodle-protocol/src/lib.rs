//! Wire protocol for Doodle.
//!
//! This crate defines the "language" that browsers and the server speak:
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`Circle`], [`RoomSettings`], ...)
//!   the values carried inside messages.
//! - **Messages** ([`Inbound`], [`Outbound`]) the `{code, msg}` envelopes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) converting envelopes to and
//!   from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or rooms.
//!
//! ```text
//! Transport (bytes) → Protocol (Inbound) → Room (game state) → Protocol (Outbound)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{
    BeginMsg, ChatMsg, CreateMsg, EndMsg, ErrorMsg, FinishMsg, Inbound, JoinMsg,
    JoinNotice, LeaveNotice, ListMsg, Outbound, RoomsMsg, ScoreMsg, TextMsg,
};
pub use types::{
    Circle, GameResult, Phase, Player, PlayerId, Recipient, RoomCode, RoomSettings,
    RoomSnapshot,
};
