//! Authentication module for producing, validating and restoring sessions.
//!
//! This module provides:
//! - `AuthenticationService`: login, cache restore, logout and validation
//! - `Session`: the authenticated identity, fresh or restored
//! - `credentials::parse`: extraction of tokens from an authenticate response
//!
//! Successful logins are cached in `lastLogin.json` via the `SessionStore`.

pub mod credentials;
pub mod service;
pub mod session;

pub use credentials::{Credentials, ParseError};
pub use service::AuthenticationService;
pub use session::{generate_client_token, Session, SessionHandle, SessionState, SessionStatus};
