use crate::cookies::JarCookieStore;
use crate::AppState;
use auth_callback::callback::{CallbackErrorCode, CallbackOutcome, CallbackRequest, RequestHeaders};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, Uri},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;

use log::*;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

#[derive(Debug, Clone, Copy)]
enum Entry {
    Detect,
    OAuth,
}

/// GET the landing point for every identity provider redirect (OAuth code,
/// PKCE redirect or emailed link). Always answers with a redirect: to the
/// post-login target on success, or to the error page.
pub async fn callback(
    State(app_state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    evaluate(&app_state, &uri, &headers, jar, Entry::Detect).await
}

/// GET the PKCE-only callback used by the browser OAuth flow. A request
/// without `state` fails instead of falling through to other entry paths.
pub async fn oauth_callback(
    State(app_state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    evaluate(&app_state, &uri, &headers, jar, Entry::OAuth).await
}

async fn evaluate(
    app_state: &AppState,
    uri: &Uri,
    headers: &HeaderMap,
    jar: CookieJar,
    entry: Entry,
) -> (CookieJar, Redirect) {
    let handler = app_state.callback_handler();
    let mut cookies = JarCookieStore::new(jar);
    let request_headers = request_headers(headers);
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    let outcome = match CallbackRequest::from_parts(
        path_and_query,
        request_headers.clone(),
        app_state.config.fallback_host(),
    ) {
        Ok(request) => match entry {
            Entry::Detect => handler.handle(&request, &mut cookies).await,
            Entry::OAuth => handler.handle_oauth(&request, &mut cookies).await,
        },
        Err(e) => {
            warn!("Unreadable callback request {}: {}", uri.path(), e.detail());
            let host = request_headers
                .host
                .as_deref()
                .unwrap_or(app_state.config.fallback_host());
            handler.reject_invalid_request(host, &mut cookies)
        }
    };

    if let CallbackOutcome::Error { error_code, .. } = &outcome {
        if is_backend_failure(*error_code) {
            error!("Identity backend failure during callback: {}", error_code);
        }
    }

    (cookies.into_jar(), Redirect::to(outcome.next_path()))
}

/// Failures on our side or the identity backend's, as opposed to stale or
/// tampered browser state.
fn is_backend_failure(code: CallbackErrorCode) -> bool {
    match code {
        CallbackErrorCode::SessionError
        | CallbackErrorCode::ExchangeError
        | CallbackErrorCode::UnknownError => true,
        CallbackErrorCode::StateError
        | CallbackErrorCode::StateMismatch
        | CallbackErrorCode::CodeError
        | CallbackErrorCode::CodeVerifierError
        | CallbackErrorCode::RedirectError
        | CallbackErrorCode::InvalidRedirect
        | CallbackErrorCode::OauthError => false,
    }
}

fn request_headers(headers: &HeaderMap) -> RequestHeaders {
    RequestHeaders {
        host: header_value(headers, &header::HOST),
        forwarded_proto: header_value(headers, &HeaderName::from_static(X_FORWARDED_PROTO)),
        referer: header_value(headers, &header::REFERER),
        origin: header_value(headers, &header::ORIGIN),
    }
}

fn header_value(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
