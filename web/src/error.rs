use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use auth_callback::error::{
    BackendErrorKind, CookieErrorKind, Error as AuthError, ErrorKind, MfaErrorKind,
    RequestErrorKind,
};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(AuthError);

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn!("Request failed: {}", self.0.detail());

        match self.0.error_kind {
            ErrorKind::Backend(backend_error_kind) => match backend_error_kind {
                BackendErrorKind::Rejected(provider) => match provider.status {
                    Some(401) | Some(403) => {
                        (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response()
                    }
                    _ => (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response(),
                },
                BackendErrorKind::Network | BackendErrorKind::InvalidResponse => {
                    (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
                }
                BackendErrorKind::Builder => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
                }
            },
            ErrorKind::Mfa(MfaErrorKind::AssuranceQueryFailed) => {
                (StatusCode::BAD_GATEWAY, "BAD GATEWAY").into_response()
            }
            ErrorKind::Request(RequestErrorKind::InvalidUrl) => {
                (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
            }
            ErrorKind::Cookie(CookieErrorKind::Encoding) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL SERVER ERROR").into_response()
            }
        }
    }
}

impl<E> From<E> for Error
where
    E: Into<AuthError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_callback::error::{backend_error, rejected, ProviderError};

    fn status_of(err: AuthError) -> StatusCode {
        Error::from(err).into_response().status()
    }

    #[test]
    fn test_backend_errors_map_to_gateway_statuses() {
        assert_eq!(
            status_of(backend_error(BackendErrorKind::Network, "timeout")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(backend_error(BackendErrorKind::InvalidResponse, "not json")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(backend_error(BackendErrorKind::Builder, "tls")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rejected_session_maps_to_unauthorized() {
        let err = rejected(ProviderError::new("invalid JWT").with_status(401));
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);

        let err = rejected(ProviderError::new("boom").with_status(500));
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_assurance_failure_maps_to_bad_gateway() {
        let err = AuthError {
            source: None,
            error_kind: ErrorKind::Mfa(MfaErrorKind::AssuranceQueryFailed),
        };
        assert_eq!(status_of(err), StatusCode::BAD_GATEWAY);
    }
}
