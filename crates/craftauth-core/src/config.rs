//! Authentication service configuration.
//!
//! Endpoints, agent identity and network timeouts. The defaults target the
//! public Mojang auth server; tests and alternative Yggdrasil deployments
//! override the URLs.

use serde::{Deserialize, Serialize};

/// Authenticate endpoint (credentials for tokens)
pub const AUTHENTICATE_URL: &str = "https://authserver.mojang.com/authenticate";

/// Validate endpoint (is this access token still good)
pub const VALIDATE_URL: &str = "https://authserver.mojang.com/validate";

/// Agent name sent with every authenticate request
const AGENT_NAME: &str = "Minecraft";

/// Agent protocol version
const AGENT_VERSION: u32 = 1;

/// HTTP request timeout in seconds.
/// The auth server normally answers within a second or two.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// TCP/TLS connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub authenticate_url: String,
    pub validate_url: String,
    pub agent_name: String,
    pub agent_version: u32,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Stable per-installation client token. When unset the server picks one.
    pub client_token: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authenticate_url: AUTHENTICATE_URL.to_string(),
            validate_url: VALIDATE_URL.to_string(),
            agent_name: AGENT_NAME.to_string(),
            agent_version: AGENT_VERSION,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            client_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_mojang() {
        let config = AuthConfig::default();
        assert_eq!(config.authenticate_url, "https://authserver.mojang.com/authenticate");
        assert_eq!(config.validate_url, "https://authserver.mojang.com/validate");
        assert_eq!(config.agent_name, "Minecraft");
        assert_eq!(config.agent_version, 1);
        assert!(config.client_token.is_none());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"request_timeout_secs": 5, "client_token": "abc"}"#)
                .expect("Failed to parse partial config");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.client_token.as_deref(), Some("abc"));
        assert_eq!(config.validate_url, VALIDATE_URL);
    }
}
