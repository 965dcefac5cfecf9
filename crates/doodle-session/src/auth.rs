//! Authentication hook for resolving a token to a player.
//!
//! Doodle doesn't implement accounts. Whatever issues tokens (a login
//! service, signed cookies, nothing at all) plugs in through the
//! [`Authenticator`] trait, which the connection layer calls on every
//! `join` and `create`.

use std::future::Future;

use doodle_protocol::{Player, PlayerId};
use rand::Rng;

use crate::SessionError;

/// Longest display name accepted, in characters.
pub const MAX_NAME_LEN: usize = 24;

/// Validates a client's token and returns their identity.
///
/// # Example
///
/// ```rust
/// use doodle_protocol::{Player, PlayerId};
/// use doodle_session::{Authenticator, SessionError};
///
/// /// Tokens are numeric player ids.
/// struct NumericAuthenticator;
///
/// impl Authenticator for NumericAuthenticator {
///     async fn authenticate(&self, token: &str) -> Result<Player, SessionError> {
///         let id: u64 = token
///             .parse()
///             .map_err(|_| SessionError::AuthFailed("token must be a number".into()))?;
///         Ok(Player::new(PlayerId(id), format!("player-{id}")))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Resolves `token` to a player with a zero score.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] if the token is rejected.
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Player, SessionError>> + Send;
}

/// Accepts anyone. The token is the display name; an empty token gets a
/// generated `Guest-NNNN` name. Every call mints a fresh random id.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestAuthenticator;

impl GuestAuthenticator {
    fn issue(token: &str) -> Result<Player, SessionError> {
        let name = token.trim();
        if name.chars().count() > MAX_NAME_LEN {
            return Err(SessionError::AuthFailed(format!(
                "name is longer than {MAX_NAME_LEN} characters"
            )));
        }
        if name.chars().any(char::is_control) {
            return Err(SessionError::AuthFailed("name contains control characters".into()));
        }

        let mut rng = rand::rng();
        let id = PlayerId(rng.random());
        let name = if name.is_empty() {
            format!("Guest-{:04}", rng.random_range(0..10_000))
        } else {
            name.to_string()
        };
        tracing::debug!(player = %id, %name, "guest identity issued");
        Ok(Player::new(id, name))
    }
}

impl Authenticator for GuestAuthenticator {
    fn authenticate(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Player, SessionError>> + Send {
        let result = Self::issue(token);
        async move { result }
    }
}
