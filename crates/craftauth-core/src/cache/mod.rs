//! On-disk cache of the last successful login.
//!
//! This module provides the `SessionStore`, the only component that reads or
//! writes `lastLogin.json` inside the Minecraft directory. The record lets
//! the launcher restore a session silently on the next start.

pub mod store;

pub use store::{PersistedLogin, PersistenceError, SessionStore};
