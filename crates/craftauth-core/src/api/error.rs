use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    /// The auth server answered with its own error object,
    /// e.g. `ForbiddenOperationException` for bad credentials.
    #[error("{error}: {message}")]
    Rejected { error: String, message: String },

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Endpoint not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error object returned by the Yggdrasil endpoints on failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(default)]
    error_message: Option<String>,
}

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
            return TransportError::Rejected {
                message: err.error_message.unwrap_or_else(|| err.error.clone()),
                error: err.error,
            };
        }

        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => TransportError::Unauthorized,
            403 => TransportError::Forbidden(truncated),
            404 => TransportError::NotFound(truncated),
            429 => TransportError::RateLimited,
            500..=599 => TransportError::ServerError(truncated),
            _ => TransportError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the server itself refused the request, as opposed to the
    /// request never completing.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TransportError::Rejected { .. }
                | TransportError::Unauthorized
                | TransportError::Forbidden(_)
        )
    }
}
