//! Error types for the `auth-callback` crate.
//!
//! A root `Error` struct holds an error kind tree plus the original source, the
//! same layering used by the web crate. The callback orchestrator never returns
//! these; it converts them into a
//! [`CallbackErrorCode`](crate::callback::CallbackErrorCode) first.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for auth-callback crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in auth-callback.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Backend(BackendErrorKind),
    Mfa(MfaErrorKind),
    Request(RequestErrorKind),
    Cookie(CookieErrorKind),
}

/// Errors from identity backend calls.
#[derive(Debug, PartialEq)]
pub enum BackendErrorKind {
    /// The backend answered and refused the operation.
    Rejected(ProviderError),
    /// The call never produced an answer (connect failure, timeout).
    Network,
    /// The backend answered with something we could not interpret.
    InvalidResponse,
    /// The HTTP client could not be constructed.
    Builder,
}

/// Errors from the multi-factor assurance check.
#[derive(Debug, PartialEq)]
pub enum MfaErrorKind {
    AssuranceQueryFailed,
}

/// Errors from reading the inbound callback request.
#[derive(Debug, PartialEq)]
pub enum RequestErrorKind {
    InvalidUrl,
}

/// Errors from encoding or decoding cookie values.
#[derive(Debug, PartialEq)]
pub enum CookieErrorKind {
    Encoding,
}

/// Error payload reported by the identity provider itself.
///
/// `message` and `code` are provider-controlled text; they are logged in full
/// but only forwarded to the browser after sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub message: String,
    pub code: Option<String>,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} ({}, HTTP {})", self.message, code, status),
            (Some(code), None) => write!(f, "{} ({})", self.message, code),
            (None, Some(status)) => write!(f, "{} (HTTP {})", self.message, status),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

impl Error {
    /// The provider error payload, when the backend explicitly rejected a call.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match &self.error_kind {
            ErrorKind::Backend(BackendErrorKind::Rejected(provider)) => Some(provider),
            _ => None,
        }
    }

    /// Best-effort human readable description, used for log lines and for
    /// pattern matching on failures that were not explicit rejections.
    pub fn detail(&self) -> String {
        match (&self.error_kind, &self.source) {
            (ErrorKind::Backend(BackendErrorKind::Rejected(provider)), _) => provider.message.clone(),
            (_, Some(source)) => source.to_string(),
            (kind, None) => format!("{:?}", kind),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Backend(BackendErrorKind::Rejected(provider)) => {
                write!(f, "Identity backend rejected request: {}", provider)
            }
            ErrorKind::Backend(kind) => write!(f, "Identity backend error: {:?}", kind),
            ErrorKind::Mfa(kind) => write!(f, "MFA error: {:?}", kind),
            ErrorKind::Request(kind) => write!(f, "Callback request error: {:?}", kind),
            ErrorKind::Cookie(kind) => write!(f, "Cookie error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Backend(BackendErrorKind::Builder)
        } else if err.is_decode() {
            ErrorKind::Backend(BackendErrorKind::InvalidResponse)
        } else {
            ErrorKind::Backend(BackendErrorKind::Network)
        };

        // The request URL carries query parameters such as `grant_type=pkce`
        Error {
            source: Some(Box::new(err.without_url())),
            error_kind,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Backend(BackendErrorKind::InvalidResponse),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Request(RequestErrorKind::InvalidUrl),
        }
    }
}

/// Helper function to create an error for an explicit provider rejection.
pub fn rejected(provider: ProviderError) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Backend(BackendErrorKind::Rejected(provider)),
    }
}

/// Helper function to create backend errors.
pub fn backend_error(kind: BackendErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Backend(kind),
    }
}

/// Helper function to create cookie errors.
pub fn cookie_error(kind: CookieErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Cookie(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_is_exposed_for_rejections() {
        let err = rejected(ProviderError::new("invalid grant").with_code("bad_code"));
        let provider = err.provider_error().expect("rejection carries provider error");
        assert_eq!(provider.code.as_deref(), Some("bad_code"));
        assert_eq!(err.detail(), "invalid grant");
    }

    #[test]
    fn test_detail_uses_source_for_non_rejections() {
        let err = backend_error(BackendErrorKind::Network, "connection reset");
        assert!(err.provider_error().is_none());
        assert_eq!(err.detail(), "connection reset");
    }

    #[test]
    fn test_display_includes_provider_code_and_status() {
        let err = rejected(
            ProviderError::new("Email link is invalid or has expired")
                .with_code("otp_expired")
                .with_status(403),
        );
        assert_eq!(
            err.to_string(),
            "Identity backend rejected request: Email link is invalid or has expired (otp_expired, HTTP 403)"
        );
    }

    #[test]
    fn test_url_parse_error_maps_to_request_kind() {
        let err: Error = url::Url::parse("::not a url").unwrap_err().into();
        assert_eq!(err.error_kind, ErrorKind::Request(RequestErrorKind::InvalidUrl));
    }
}
