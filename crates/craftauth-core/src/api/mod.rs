//! Transport module for the Mojang authentication service.
//!
//! This module provides the `Transport` seam and its HTTP implementation,
//! `HttpTransport`. Every exchange with the auth server is a single JSON
//! POST whose response body is handed back as raw text.

pub mod client;
pub mod error;

pub use client::{HttpTransport, Transport};
pub use error::TransportError;
