//! Parsing of authenticate responses into a credential set.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Empty response body")]
    Empty,

    #[error("Response is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("Response is missing required fields: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("Expected a JSON object for {0}")]
    NotAnObject(&'static str),
}

/// Tokens and profile identity extracted from a successful authenticate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub client_token: String,
    pub profile_id: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateResponse {
    access_token: String,
    client_token: String,
    selected_profile: SelectedProfile,
}

#[derive(Debug, Deserialize)]
struct SelectedProfile {
    id: String,
    name: String,
}

/// Parse a raw authenticate response.
///
/// The response and its `selectedProfile` must be JSON objects. Every field
/// is required and must be a string. Nothing is defaulted.
pub fn parse(text: &str) -> Result<Credentials, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let value: Value = serde_json::from_str(text).map_err(ParseError::Syntax)?;

    // serde's derived structs also accept sequences in field order.
    if !value.is_object() {
        return Err(ParseError::NotAnObject("response"));
    }
    if value
        .get("selectedProfile")
        .is_some_and(|profile| !profile.is_object())
    {
        return Err(ParseError::NotAnObject("selectedProfile"));
    }

    let response: AuthenticateResponse =
        serde_json::from_value(value).map_err(ParseError::Schema)?;

    Ok(Credentials {
        access_token: response.access_token,
        client_token: response.client_token,
        profile_id: response.selected_profile.id,
        display_name: response.selected_profile.name,
    })
}
