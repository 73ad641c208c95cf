use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::user::CurrentUserResponse;
use axum::{http::StatusCode, response::IntoResponse, Json};

use log::*;

/// GET the currently signed-in user
pub async fn read(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    debug!("GET current user {}", user.id);

    Json(ApiResponse::new(
        StatusCode::OK.into(),
        CurrentUserResponse::from(user),
    ))
}
