use crate::{
    controller::{
        auth_callback_controller, callback_error_controller, health_check_controller,
        mfa_controller, user_controller,
    },
    AppState,
};
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(auth_callback_routes(app_state.clone()))
        .merge(health_routes())
        .merge(mfa_routes(app_state.clone()))
        .merge(user_routes(app_state))
        .layer(TraceLayer::new_for_http())
}

fn auth_callback_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/callback", get(auth_callback_controller::callback))
        .route(
            "/auth/callback/oauth",
            get(auth_callback_controller::oauth_callback),
        )
        .route(
            "/auth/callback/error",
            get(callback_error_controller::error_page),
        )
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn mfa_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/auth/mfa/status", get(mfa_controller::status))
        .with_state(app_state)
}

fn user_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/me", get(user_controller::read))
        .with_state(app_state)
}
