//! Responses for the current-user endpoints.

use auth_callback::backend::User;
use serde::Serialize;

/// The signed-in user, without factor details
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Whether the user has enrolled a verified second factor
    pub mfa_enrolled: bool,
}

impl From<User> for CurrentUserResponse {
    fn from(user: User) -> Self {
        let mfa_enrolled = user.has_verified_factor();
        Self {
            id: user.id,
            email: user.email,
            mfa_enrolled,
        }
    }
}

/// Second-factor status of the current session
#[derive(Debug, Serialize)]
pub struct MfaStatusResponse {
    pub requires_second_factor: bool,
}
