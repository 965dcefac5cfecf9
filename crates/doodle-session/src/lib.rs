//! Player identity for Doodle.
//!
//! The server never decides who a player is. It hands the client's token to
//! an [`Authenticator`] and trusts the [`Player`](doodle_protocol::Player)
//! that comes back. [`GuestAuthenticator`] is the built-in implementation:
//! the token is just a display name.
//!
//! ```text
//! Connection (above)  ← calls authenticate() on join/create
//!     ↕
//! Session Layer (this crate)  ← token → Player
//!     ↕
//! Protocol Layer (below)  ← provides Player, PlayerId
//! ```

mod auth;
mod error;

pub use auth::{Authenticator, GuestAuthenticator, MAX_NAME_LEN};
pub use error::SessionError;
