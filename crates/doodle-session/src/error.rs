//! Error types for the session layer.

/// Errors that can occur while establishing who a player is.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was rejected by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}

impl SessionError {
    pub fn status(&self) -> u16 {
        match self {
            Self::AuthFailed(_) => 403,
        }
    }
}
