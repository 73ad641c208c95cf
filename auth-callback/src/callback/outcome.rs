//! Terminal results of a callback evaluation.

use std::fmt;

use url::form_urlencoded;

/// Why a callback evaluation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackErrorCode {
    StateError,
    StateMismatch,
    CodeError,
    CodeVerifierError,
    SessionError,
    ExchangeError,
    RedirectError,
    InvalidRedirect,
    OauthError,
    UnknownError,
}

impl CallbackErrorCode {
    pub const ALL: [CallbackErrorCode; 10] = [
        CallbackErrorCode::StateError,
        CallbackErrorCode::StateMismatch,
        CallbackErrorCode::CodeError,
        CallbackErrorCode::CodeVerifierError,
        CallbackErrorCode::SessionError,
        CallbackErrorCode::ExchangeError,
        CallbackErrorCode::RedirectError,
        CallbackErrorCode::InvalidRedirect,
        CallbackErrorCode::OauthError,
        CallbackErrorCode::UnknownError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackErrorCode::StateError => "STATE_ERROR",
            CallbackErrorCode::StateMismatch => "STATE_MISMATCH",
            CallbackErrorCode::CodeError => "CODE_ERROR",
            CallbackErrorCode::CodeVerifierError => "CODE_VERIFIER_ERROR",
            CallbackErrorCode::SessionError => "SESSION_ERROR",
            CallbackErrorCode::ExchangeError => "EXCHANGE_ERROR",
            CallbackErrorCode::RedirectError => "REDIRECT_ERROR",
            CallbackErrorCode::InvalidRedirect => "INVALID_REDIRECT",
            CallbackErrorCode::OauthError => "OAUTH_ERROR",
            CallbackErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for CallbackErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of evaluating one callback request. Both variants carry the path
/// the browser is sent to next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Success {
        next_path: String,
    },
    Error {
        error_code: CallbackErrorCode,
        message: String,
        next_path: String,
    },
}

impl CallbackOutcome {
    pub fn success(next_path: impl Into<String>) -> Self {
        CallbackOutcome::Success {
            next_path: next_path.into(),
        }
    }

    /// Build an error outcome whose `next_path` is `error_path` with the error
    /// details appended as query parameters.
    pub fn error(
        error_path: &str,
        error_code: CallbackErrorCode,
        message: impl Into<String>,
        provider_code: Option<&str>,
    ) -> Self {
        let message = message.into();

        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("error_code", error_code.as_str());
        if let Some(code) = provider_code.and_then(sanitize_provider_code) {
            query.append_pair("code", &code);
        }
        query.append_pair("error", &message);

        let separator = if error_path.contains('?') { '&' } else { '?' };
        let next_path = format!("{}{}{}", error_path, separator, query.finish());

        CallbackOutcome::Error {
            error_code,
            message,
            next_path,
        }
    }

    pub fn next_path(&self) -> &str {
        match self {
            CallbackOutcome::Success { next_path } => next_path,
            CallbackOutcome::Error { next_path, .. } => next_path,
        }
    }

    pub fn error_code(&self) -> Option<CallbackErrorCode> {
        match self {
            CallbackOutcome::Success { .. } => None,
            CallbackOutcome::Error { error_code, .. } => Some(*error_code),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallbackOutcome::Success { .. })
    }
}

const MAX_PROVIDER_CODE_LEN: usize = 64;

/// Keep provider codes to a conservative identifier alphabet before they are
/// placed in a URL.
pub fn sanitize_provider_code(code: &str) -> Option<String> {
    let sanitized: String = code
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(MAX_PROVIDER_CODE_LEN)
        .collect();

    (!sanitized.is_empty()).then_some(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(CallbackErrorCode::CodeVerifierError.as_str(), "CODE_VERIFIER_ERROR");
        assert_eq!(CallbackErrorCode::OauthError.to_string(), "OAUTH_ERROR");
    }

    #[test]
    fn test_error_outcome_points_at_error_page() {
        let outcome = CallbackOutcome::error(
            "/auth/callback/error",
            CallbackErrorCode::ExchangeError,
            "Email link is invalid",
            Some("otp_expired"),
        );

        assert_eq!(
            outcome.next_path(),
            "/auth/callback/error?error_code=EXCHANGE_ERROR&code=otp_expired&error=Email+link+is+invalid"
        );
        assert_eq!(outcome.error_code(), Some(CallbackErrorCode::ExchangeError));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_error_path_with_existing_query() {
        let outcome = CallbackOutcome::error("/error?lang=ja", CallbackErrorCode::UnknownError, "x", None);
        assert_eq!(outcome.next_path(), "/error?lang=ja&error_code=UNKNOWN_ERROR&error=x");
    }

    #[test]
    fn test_message_is_percent_encoded() {
        let outcome = CallbackOutcome::error("/e", CallbackErrorCode::OauthError, "a&b=c<script>", None);
        assert_eq!(outcome.next_path(), "/e?error_code=OAUTH_ERROR&error=a%26b%3Dc%3Cscript%3E");
    }

    #[test]
    fn test_provider_code_is_sanitized() {
        assert_eq!(sanitize_provider_code("bad_code_verifier").as_deref(), Some("bad_code_verifier"));
        assert_eq!(sanitize_provider_code("<b>x</b>").as_deref(), Some("bxb"));
        assert_eq!(sanitize_provider_code("&&&"), None);
        assert_eq!(sanitize_provider_code(&"a".repeat(100)).map(|c| c.len()), Some(64));
    }

    #[test]
    fn test_success_outcome() {
        let outcome = CallbackOutcome::success("/dashboard");
        assert!(outcome.is_success());
        assert_eq!(outcome.next_path(), "/dashboard");
        assert_eq!(outcome.error_code(), None);
    }
}
