//! Session requirement guard for protected routes.

use std::error::Error as StdError;
use std::fmt;

use tracing::{debug, warn};

use crate::backend::{IdentityBackend, User};
use crate::mfa::requires_second_factor;

/// Where denied requests are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub sign_in_path: String,
    pub mfa_verify_path: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            sign_in_path: "/".to_string(),
            mfa_verify_path: "/".to_string(),
        }
    }
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    /// No session, or the user lookup failed.
    Authentication,
    /// A session exists but its second factor has not been verified.
    MultiFactorAuth,
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GuardError::Authentication => write!(f, "Authentication required"),
            GuardError::MultiFactorAuth => write!(f, "Multi-factor authentication required"),
        }
    }
}

impl StdError for GuardError {}

/// Result of [`require_user`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequireUser {
    Authenticated(User),
    Denied {
        error: GuardError,
        redirect_to: String,
    },
}

impl RequireUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            RequireUser::Authenticated(user) => Some(user),
            RequireUser::Denied { .. } => None,
        }
    }
}

/// Require an authenticated user whose second factor, if enrolled, has been
/// verified. Never fails; callers branch on the result.
///
/// A failed assurance query denies with [`GuardError::MultiFactorAuth`].
pub async fn require_user<B>(backend: &B, paths: &GuardPaths) -> RequireUser
where
    B: IdentityBackend + ?Sized,
{
    let user = match backend.get_user().await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("No active session");
            return deny(GuardError::Authentication, &paths.sign_in_path);
        }
        Err(e) => {
            warn!("Failed to load current user: {}", e);
            return deny(GuardError::Authentication, &paths.sign_in_path);
        }
    };

    match requires_second_factor(backend).await {
        Ok(false) => RequireUser::Authenticated(user),
        Ok(true) => {
            debug!("User {} must complete a second factor", user.id);
            deny(GuardError::MultiFactorAuth, &paths.mfa_verify_path)
        }
        Err(e) => {
            warn!("Assurance check failed for user {}, requiring second factor: {}", user.id, e);
            deny(GuardError::MultiFactorAuth, &paths.mfa_verify_path)
        }
    }
}

fn deny(error: GuardError, redirect_to: &str) -> RequireUser {
    RequireUser::Denied {
        error,
        redirect_to: redirect_to.to_string(),
    }
}
