//! Identity backend seam.
//!
//! The callback pipeline only needs four capabilities from the identity
//! provider. They are declared here as a narrow trait so the HTTP client,
//! or any test double, can be substituted.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub mod http;

pub use http::HttpIdentityBackend;

/// Kinds of emailed one-time tokens accepted by the verify endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Signup,
    Invite,
    Magiclink,
    Recovery,
    EmailChange,
    Email,
}

#[derive(Debug, PartialEq, Eq)]
pub struct OtpTypeParseError;

impl OtpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpType::Signup => "signup",
            OtpType::Invite => "invite",
            OtpType::Magiclink => "magiclink",
            OtpType::Recovery => "recovery",
            OtpType::EmailChange => "email_change",
            OtpType::Email => "email",
        }
    }
}

impl FromStr for OtpType {
    type Err = OtpTypeParseError;

    fn from_str(value: &str) -> Result<OtpType, Self::Err> {
        match value.to_lowercase().as_str() {
            "signup" => Ok(OtpType::Signup),
            "invite" => Ok(OtpType::Invite),
            "magiclink" => Ok(OtpType::Magiclink),
            "recovery" => Ok(OtpType::Recovery),
            "email_change" => Ok(OtpType::EmailChange),
            "email" => Ok(OtpType::Email),
            _ => Err(OtpTypeParseError),
        }
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authenticator assurance level of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssuranceLevel {
    /// Single factor (password, magic link, OAuth).
    Aal1,
    /// A second factor has been verified.
    Aal2,
}

impl AssuranceLevel {
    pub fn is_elevated(&self) -> bool {
        matches!(self, AssuranceLevel::Aal2)
    }
}

/// Current and next assurance level reported for the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssuranceLevels {
    pub current_level: Option<AssuranceLevel>,
    pub next_level: Option<AssuranceLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Verified,
    #[serde(other)]
    Unverified,
}

/// An enrolled second factor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    pub id: String,
    #[serde(default)]
    pub factor_type: Option<String>,
    pub status: FactorStatus,
}

/// Authenticated user as reported by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub factors: Option<Vec<Factor>>,
}

impl User {
    pub fn has_verified_factor(&self) -> bool {
        self.factors
            .iter()
            .flatten()
            .any(|factor| factor.status == FactorStatus::Verified)
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Session issued after a successful code exchange or token verification.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp in seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    /// Assurance levels implied by this session's token and the user's factors.
    pub fn assurance_levels(&self) -> AssuranceLevels {
        let current_level = access_token_assurance_level(self.access_token.expose_secret());
        match &self.user {
            Some(user) => assurance_levels_for(current_level, user),
            None => AssuranceLevels {
                current_level,
                next_level: current_level,
            },
        }
    }
}

/// Next level is elevated once the user has any verified factor, otherwise it
/// stays at whatever the token already asserts.
pub fn assurance_levels_for(current_level: Option<AssuranceLevel>, user: &User) -> AssuranceLevels {
    let next_level = if user.has_verified_factor() {
        Some(AssuranceLevel::Aal2)
    } else {
        current_level
    };

    AssuranceLevels {
        current_level,
        next_level,
    }
}

#[derive(Deserialize)]
struct AccessTokenClaims {
    #[serde(default)]
    aal: Option<AssuranceLevel>,
}

/// Read the `aal` claim from a JWT access token without verifying it.
///
/// The token came from the backend over TLS (or from our own httpOnly cookie);
/// the claim only decides whether to prompt for a second factor, never whether
/// to grant access.
pub fn access_token_assurance_level(access_token: &str) -> Option<AssuranceLevel> {
    let payload = access_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: AccessTokenClaims = serde_json::from_slice(&bytes).ok()?;
    claims.aal
}

/// Trait for the identity backend consulted during callbacks and route guards.
///
/// Every method reports provider refusals as
/// [`BackendErrorKind::Rejected`](crate::error::BackendErrorKind::Rejected) and
/// transport failures as the other backend kinds; callers never retry.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Verify an emailed token hash.
    ///
    /// Returns the session the backend issued, if any.
    async fn verify_otp(&self, otp_type: OtpType, token_hash: &str) -> Result<Option<Session>, Error>;

    /// Exchange an authorization code for a session.
    ///
    /// `Ok(None)` means the backend accepted the code but returned no session.
    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<Session>, Error>;

    /// Current and next assurance level for the active session.
    async fn authenticator_assurance_level(&self) -> Result<AssuranceLevels, Error>;

    /// The user owning the active session, `None` when there is no session.
    async fn get_user(&self) -> Result<Option<User>, Error>;

    /// Toggle the warning emitted when session queries run without a request
    /// context. Returns the previous setting.
    fn set_suppress_context_warning(&self, _suppress: bool) -> bool {
        false
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_otp_type_round_trips_through_str() {
        assert_eq!("magiclink".parse::<OtpType>(), Ok(OtpType::Magiclink));
        assert_eq!("EMAIL".parse::<OtpType>(), Ok(OtpType::Email));
        assert_eq!(OtpType::EmailChange.as_str(), "email_change");
        assert_eq!("sms".parse::<OtpType>(), Err(OtpTypeParseError));
    }

    #[test]
    fn test_access_token_aal_claim_is_read() {
        assert_eq!(access_token_assurance_level(&token_with_aal("aal1")), Some(AssuranceLevel::Aal1));
        assert_eq!(access_token_assurance_level(&token_with_aal("aal2")), Some(AssuranceLevel::Aal2));
        assert_eq!(access_token_assurance_level("not-a-jwt"), None);
        assert_eq!(access_token_assurance_level("a.%%%.c"), None);
    }

    #[test]
    fn test_session_assurance_levels_with_verified_factor() {
        let levels = session("aal1", Some(user(true))).assurance_levels();
        assert_eq!(levels.current_level, Some(AssuranceLevel::Aal1));
        assert_eq!(levels.next_level, Some(AssuranceLevel::Aal2));
    }

    #[test]
    fn test_session_assurance_levels_without_factor_stay_current() {
        let levels = session("aal1", Some(user(false))).assurance_levels();
        assert_eq!(levels.current_level, Some(AssuranceLevel::Aal1));
        assert_eq!(levels.next_level, Some(AssuranceLevel::Aal1));

        let levels = session("aal2", None).assurance_levels();
        assert_eq!(levels.next_level, Some(AssuranceLevel::Aal2));
    }

    #[test]
    fn test_user_deserializes_null_factors() {
        let user: User =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.c","factors":null}"#).unwrap();
        assert!(!user.has_verified_factor());

        let user: User = serde_json::from_str(
            r#"{"id":"u1","factors":[{"id":"f1","factor_type":"totp","status":"unverified"},{"id":"f2","status":"verified"}]}"#,
        )
        .unwrap();
        assert!(user.has_verified_factor());
    }

    #[test]
    fn test_unknown_factor_status_counts_as_unverified() {
        let factor: Factor = serde_json::from_str(r#"{"id":"f1","status":"pending"}"#).unwrap();
        assert_eq!(factor.status, FactorStatus::Unverified);
    }
}
