use crate::cookies::session_access_token;
use crate::AppState;
use auth_callback::backend::User;
use auth_callback::guard::{require_user, RequireUser};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Redirect};
use axum_extra::extract::cookie::CookieJar;
use log::*;

/// The signed-in user of a request whose second factor, if enrolled, has been
/// verified.
pub(crate) struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Redirect;

    // Reads the session cookie and asks the identity backend who it belongs to.
    // Any denial redirects to the sign-in or second-factor page.
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let access_token = session_access_token(&jar, state.config.session_cookie_name());
        let backend = state.identity_backend(access_token);

        match require_user(&backend, &state.config.guard_paths()).await {
            RequireUser::Authenticated(user) => Ok(AuthenticatedUser(user)),
            RequireUser::Denied { error, redirect_to } => {
                debug!("{} for {}, redirecting to {}", error, parts.uri.path(), redirect_to);
                Err(Redirect::to(&redirect_to))
            }
        }
    }
}
