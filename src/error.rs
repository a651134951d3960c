//! Error type shared by the session, the Shapes client and token storage.

use thiserror::Error;

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors produced while logging in, sending messages or touching storage.
///
/// The network variants display their message verbatim so the text the
/// server sent back is exactly what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The request could not complete at all.
    #[error("{0}")]
    Transport(String),

    /// The code exchange was rejected or the response was malformed.
    #[error("{0}")]
    Exchange(String),

    /// The chat request was rejected, malformed, or returned no choices.
    #[error("{0}")]
    Send(String),

    /// No token was found in either storage backend.
    #[error("No token found in the durable store or cookies.")]
    StorageMiss,

    /// A message was sent without holding a token.
    #[error("Auth token is not available.")]
    MissingToken,

    /// A storage backend failed to read or write.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Another request is still in flight.
    #[error("A request is already in progress.")]
    Busy,

    /// The action does not apply to the current step.
    #[error("{0}")]
    InvalidState(&'static str),
}

impl AuthError {
    /// Short title used for the notice raised alongside this error.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Transport(_) => "Network Error",
            Self::Exchange(_) | Self::MissingToken | Self::InvalidState(_) | Self::Busy => "Error",
            Self::Send(_) => "API Error",
            Self::StorageMiss => "Not Found",
            Self::Storage(_) => "Storage Error",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport("Request timed out".to_string())
        } else if err.is_connect() {
            Self::Transport(format!("Connection failed: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
