//! Session cookie codec.
//!
//! The session is stored as `base64-` followed by the URL-safe base64 of a
//! small JSON document, so the value never needs cookie quoting.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::backend::Session;
use crate::error::{cookie_error, CookieErrorKind, Error};

const VALUE_PREFIX: &str = "base64-";

/// Seven days, matching the identity provider's refresh token lifetime.
pub const DEFAULT_SESSION_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Name and lifetime of the cookie carrying the established session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookieSettings {
    pub name: String,
    pub max_age: i64,
}

impl SessionCookieSettings {
    pub fn new(name: impl Into<String>, max_age: i64) -> Self {
        Self {
            name: name.into(),
            max_age,
        }
    }
}

impl Default for SessionCookieSettings {
    fn default() -> Self {
        Self::new("sb-auth-token", DEFAULT_SESSION_MAX_AGE_SECS)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSession<'a> {
    access_token: &'a str,
    refresh_token: &'a str,
    token_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

/// Encode a session into a cookie value.
pub fn encode_session(session: &Session) -> Result<String, Error> {
    let stored = StoredSession {
        access_token: session.access_token.expose_secret(),
        refresh_token: session.refresh_token.expose_secret(),
        token_type: &session.token_type,
        expires_at: session.expires_at,
    };

    let json = serde_json::to_vec(&stored)
        .map_err(|e| cookie_error(CookieErrorKind::Encoding, &e.to_string()))?;

    Ok(format!("{}{}", VALUE_PREFIX, URL_SAFE_NO_PAD.encode(json)))
}

/// Extract the access token from a session cookie value.
///
/// Returns `None` for anything that was not produced by [`encode_session`].
pub fn decode_access_token(value: &str) -> Option<SecretString> {
    let encoded = value.strip_prefix(VALUE_PREFIX)?;
    let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    let stored: StoredSession = serde_json::from_slice(&bytes).ok()?;

    if stored.access_token.is_empty() {
        return None;
    }
    Some(SecretString::new(stored.access_token.to_string()))
}
