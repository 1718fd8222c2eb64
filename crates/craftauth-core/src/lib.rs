//! craftauth-core - session management for a Minecraft launcher.
//!
//! Exchanges account credentials for a game session against the Mojang
//! auth server, caches the resulting tokens on disk and restores them on
//! the next start after checking they are still valid.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;

pub use api::{HttpTransport, Transport, TransportError};
pub use auth::{AuthenticationService, Session, SessionHandle, SessionStatus};
pub use cache::{PersistedLogin, PersistenceError, SessionStore};
pub use config::AuthConfig;
pub use error::AuthError;
