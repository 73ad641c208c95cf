use crate::controller::ApiResponse;
use crate::cookies::session_access_token;
use crate::params::user::MfaStatusResponse;
use crate::{AppState, Error};
use auth_callback::mfa::requires_second_factor;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;

use log::*;

/// GET whether the current session still has to complete a second factor.
/// Used by the second-factor page, so it is reachable with a pending factor.
pub async fn status(
    State(app_state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, Error> {
    let Some(access_token) = session_access_token(&jar, app_state.config.session_cookie_name())
    else {
        debug!("MFA status requested without a session cookie");
        return Ok((StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response());
    };

    let backend = app_state.identity_backend(Some(access_token));
    let requires_second_factor = requires_second_factor(&backend).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        MfaStatusResponse {
            requires_second_factor,
        },
    ))
    .into_response())
}
