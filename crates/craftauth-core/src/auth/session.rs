use std::fmt;

use uuid::Uuid;

use super::credentials::Credentials;
use crate::cache::PersistedLogin;

/// Launcher session argument, `token:<accessToken>:<profileId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(access_token: &str, profile_id: &str) -> Self {
        Self(format!("token:{}:{}", access_token, profile_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated identity.
///
/// A session built from a live authenticate response keeps that response
/// next to what was extracted from it. A restored session only has the
/// cached record to go on. Accessors read whichever one applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Fresh {
        raw_response: String,
        credentials: Credentials,
        username: Option<String>,
    },
    Cached {
        record: PersistedLogin,
    },
}

impl Session {
    pub fn access_token(&self) -> &str {
        match self {
            Session::Fresh { credentials, .. } => &credentials.access_token,
            Session::Cached { record } => &record.access_token,
        }
    }

    pub fn client_token(&self) -> &str {
        match self {
            Session::Fresh { credentials, .. } => &credentials.client_token,
            Session::Cached { record } => &record.client_token,
        }
    }

    pub fn profile_id(&self) -> &str {
        match self {
            Session::Fresh { credentials, .. } => &credentials.profile_id,
            Session::Cached { record } => &record.profile_id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Session::Fresh { credentials, .. } => &credentials.display_name,
            Session::Cached { record } => &record.display_name,
        }
    }

    /// Login name the user typed, if any
    pub fn username(&self) -> Option<&str> {
        match self {
            Session::Fresh { username, .. } => username.as_deref(),
            Session::Cached { record } => record.username.as_deref(),
        }
    }

    /// Raw authenticate response, only kept for fresh logins
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Session::Fresh { raw_response, .. } => Some(raw_response),
            Session::Cached { .. } => None,
        }
    }

    pub fn is_restored(&self) -> bool {
        matches!(self, Session::Cached { .. })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.access_token(), self.profile_id())
    }

    pub fn to_persisted(&self) -> PersistedLogin {
        match self {
            Session::Cached { record } => record.clone(),
            Session::Fresh {
                credentials,
                username,
                ..
            } => PersistedLogin {
                username: username.clone(),
                display_name: credentials.display_name.clone(),
                access_token: credentials.access_token.clone(),
                client_token: credentials.client_token.clone(),
                profile_id: credentials.profile_id.clone(),
            },
        }
    }
}

/// Where the service is in its login lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(Session),
    /// A cached token was checked and rejected.
    Invalid,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionState::Authenticating => SessionStatus::Authenticating,
            SessionState::Authenticated(_) => SessionStatus::Authenticated,
            SessionState::Invalid => SessionStatus::Invalid,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Invalid,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Unauthenticated => write!(f, "Not logged in"),
            SessionStatus::Authenticating => write!(f, "Logging in"),
            SessionStatus::Authenticated => write!(f, "Logged in"),
            SessionStatus::Invalid => write!(f, "Saved login invalid"),
        }
    }
}

/// Generate a random client token in UUID v4 form.
///
/// Launchers keep one of these per installation and send it with every
/// authenticate request.
pub fn generate_client_token() -> String {
    Uuid::new_v4().to_string()
}
