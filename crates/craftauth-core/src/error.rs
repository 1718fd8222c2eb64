use thiserror::Error;

use crate::api::TransportError;
use crate::auth::credentials::ParseError;
use crate::cache::PersistenceError;

/// Everything that can go wrong while producing, validating or restoring a
/// session. None of these are fatal; callers show `user_message` and move on.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Could not parse auth response: {0}")]
    Parse(#[from] ParseError),

    #[error("Cached access token was rejected: {0}")]
    ValidationFailure(#[source] TransportError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("No authenticated session")]
    NotAuthenticated,
}

impl AuthError {
    /// Short message suitable for showing next to a login form.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Transport(TransportError::Rejected { message, .. }) => message.clone(),
            AuthError::Transport(TransportError::Network(e)) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            AuthError::Transport(TransportError::Network(_)) => {
                "Unable to connect to the login server. Check your internet connection."
                    .to_string()
            }
            AuthError::Transport(TransportError::RateLimited) => {
                "Too many login attempts. Please wait a moment.".to_string()
            }
            AuthError::Transport(TransportError::Unauthorized)
            | AuthError::Transport(TransportError::Forbidden(_)) => {
                "Invalid username or password".to_string()
            }
            AuthError::Transport(e) => format!("Login failed: {}", e),
            AuthError::Parse(_) => "Login failed: unexpected response from server".to_string(),
            AuthError::ValidationFailure(e) if !e.is_rejection() => {
                "Unable to verify saved login with the server. Please log in again.".to_string()
            }
            AuthError::ValidationFailure(_) => {
                "Saved login has expired. Please log in again.".to_string()
            }
            AuthError::Persistence(e) => format!("Could not access saved login: {}", e),
            AuthError::NotAuthenticated => "Not logged in".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = AuthError::from(TransportError::Rejected {
            error: "ForbiddenOperationException".to_string(),
            message: "Invalid credentials. Invalid username or password.".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Invalid credentials. Invalid username or password."
        );
    }

    #[test]
    fn test_user_message_per_kind() {
        assert_eq!(
            AuthError::from(ParseError::Empty).user_message(),
            "Login failed: unexpected response from server"
        );
        assert_eq!(
            AuthError::ValidationFailure(TransportError::Unauthorized).user_message(),
            "Saved login has expired. Please log in again."
        );
        assert_eq!(
            AuthError::from(TransportError::Forbidden(String::new())).user_message(),
            "Invalid username or password"
        );
        assert_eq!(AuthError::NotAuthenticated.user_message(), "Not logged in");
    }
}
