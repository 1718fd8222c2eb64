//! HTTP transport for the Mojang authentication endpoints.
//!
//! The service core is synchronous, so this uses reqwest's blocking client.
//! Callers that own a UI thread are expected to run it on a worker.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header;
use tracing::{debug, warn};

use super::TransportError;
use crate::config::AuthConfig;

const USER_AGENT: &str = concat!("craftauth/", env!("CARGO_PKG_VERSION"));

/// A single JSON POST against an authentication endpoint.
///
/// Implementations return the full response body as text. Any failure,
/// including a non-2xx status, comes back as a `TransportError` value.
pub trait Transport {
    fn post(&self, url: &str, body: &str) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post(url, body)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn post(&self, url: &str, body: &str) -> Result<String, TransportError> {
        (**self).post(url, body)
    }
}

/// Transport backed by reqwest.
/// Clone is cheap - the client shares its connection pool.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &AuthConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Check if response is successful, returning an error with body if not.
    fn check_response(url: &str, response: Response) -> Result<Response, TransportError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().unwrap_or_default();
        warn!(
            endpoint = url,
            status = status.as_u16(),
            len = body.len(),
            "Auth server returned an error status"
        );
        Err(TransportError::from_status(status, &body))
    }
}

impl Transport for HttpTransport {
    fn post(&self, url: &str, body: &str) -> Result<String, TransportError> {
        debug!(endpoint = url, "Sending POST request");

        let response = self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .header(header::CONTENT_LANGUAGE, "en-US")
            .body(body.to_owned())
            .send()
            .map_err(|e| {
                warn!(endpoint = url, error = %e, "POST request failed");
                TransportError::Network(e)
            })?;

        let response = Self::check_response(url, response)?;

        // The response (and its pooled connection) is released when `text`
        // consumes it, on both the success and the error path.
        let text = response.text().map_err(|e| {
            warn!(endpoint = url, error = %e, "Failed to read response body");
            TransportError::Network(e)
        })?;

        debug!(endpoint = url, len = text.len(), "Received response");
        Ok(text)
    }
}
