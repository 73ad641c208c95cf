//! User-facing authentication error messages.

use std::fmt;
use std::str::FromStr;

use crate::callback::CallbackErrorCode;

/// Language used for messages shown on the callback error page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Ja,
    En,
}

#[derive(Debug, PartialEq, Eq)]
pub struct LocaleParseError;

impl FromStr for Locale {
    type Err = LocaleParseError;

    fn from_str(value: &str) -> Result<Locale, Self::Err> {
        match value.to_lowercase().as_str() {
            "ja" => Ok(Locale::Ja),
            "en" => Ok(Locale::En),
            _ => Err(LocaleParseError),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Locale::Ja => write!(f, "ja"),
            Locale::En => write!(f, "en"),
        }
    }
}

/// Fragments identifying a verifier or one-time token that no longer matches
/// this browser. Compared case-insensitively.
const VERIFIER_ERROR_PATTERNS: &[&str] = &["pkce_verifier", "otp", "verifier", "pkce", "expired"];

/// Backend code for a rejected or expired JWT.
const JWT_ERROR_CODE: &str = "PGRST301";

/// `true` when the error text points at a stale or foreign PKCE verifier.
pub fn is_verifier_error(error: &str) -> bool {
    let error = error.to_lowercase();
    VERIFIER_ERROR_PATTERNS
        .iter()
        .any(|pattern| error.contains(pattern))
}

/// Translate a backend error into the message shown to the user.
pub fn auth_error_message(error: &str, code: Option<&str>, locale: Locale) -> String {
    if is_verifier_error(error) {
        return match locale {
            Locale::Ja => "認証セッションの有効期限が切れています。別のブラウザやデバイスで認証を試みた場合は、同じブラウザで最初から認証フローをやり直してください。",
            Locale::En => "Your sign-in session has expired. If you started signing in on another browser or device, start again from the beginning in this browser.",
        }
        .to_string();
    }

    if code == Some(JWT_ERROR_CODE) {
        return retry_message(locale).to_string();
    }

    error.to_string()
}

fn retry_message(locale: Locale) -> &'static str {
    match locale {
        Locale::Ja => "認証に失敗しました。もう一度お試しください。",
        Locale::En => "Authentication failed. Please try again.",
    }
}

/// Message for failures that carry no provider text.
pub fn callback_error_message(error_code: CallbackErrorCode, locale: Locale) -> &'static str {
    use CallbackErrorCode::*;

    match (error_code, locale) {
        (StateError, Locale::Ja) => "認証状態が見つかりません。もう一度ログインしてください。",
        (StateError, Locale::En) => "The sign-in state is missing. Please sign in again.",
        (StateMismatch, Locale::Ja) => "認証状態が一致しません。もう一度ログインしてください。",
        (StateMismatch, Locale::En) => "The sign-in state does not match. Please sign in again.",
        (CodeError, Locale::Ja) => "認証コードが見つかりません。",
        (CodeError, Locale::En) => "The authorization code is missing.",
        (CodeVerifierError, Locale::Ja) => "認証セッションが見つかりません。同じブラウザで最初からやり直してください。",
        (CodeVerifierError, Locale::En) => "The sign-in session was not found. Start again in the same browser.",
        (SessionError, Locale::Ja) => "セッションを確立できませんでした。",
        (SessionError, Locale::En) => "The session could not be established.",
        (RedirectError, Locale::Ja) => "リダイレクト先が見つかりません。",
        (RedirectError, Locale::En) => "The redirect target is missing.",
        (InvalidRedirect, Locale::Ja) => "許可されていないリダイレクト先です。",
        (InvalidRedirect, Locale::En) => "The redirect target is not allowed.",
        (ExchangeError | OauthError | UnknownError, locale) => retry_message(locale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verifier_patterns_are_case_insensitive() {
        for error in [
            "invalid request: both auth code and code verifier should be non-empty",
            "PKCE flow failed",
            "Email link is invalid or has EXPIRED",
            "otp_expired",
            "missing pkce_verifier",
        ] {
            assert!(is_verifier_error(error), "{error}");
        }
        assert!(!is_verifier_error("Invalid login credentials"));
    }

    #[test]
    fn test_verifier_error_gets_same_browser_message() {
        let message = auth_error_message("token has expired", None, Locale::Ja);
        assert!(message.starts_with("認証セッションの有効期限が切れています"));

        let message = auth_error_message("token has expired", None, Locale::En);
        assert!(message.contains("same") || message.contains("this browser"));
    }

    #[test]
    fn test_jwt_code_gets_retry_message() {
        assert_eq!(
            auth_error_message("JWT invalid", Some("PGRST301"), Locale::Ja),
            "認証に失敗しました。もう一度お試しください。"
        );
    }

    #[test]
    fn test_other_errors_pass_through() {
        assert_eq!(
            auth_error_message("User not allowed", Some("not_admin"), Locale::En),
            "User not allowed"
        );
    }

    #[test]
    fn test_locale_parsing() {
        assert_eq!("JA".parse::<Locale>(), Ok(Locale::Ja));
        assert_eq!("en".parse::<Locale>(), Ok(Locale::En));
        assert_eq!("fr".parse::<Locale>(), Err(LocaleParseError));
        assert_eq!(Locale::default(), Locale::Ja);
    }

    #[test]
    fn test_every_code_has_a_message() {
        for code in CallbackErrorCode::ALL {
            assert!(!callback_error_message(code, Locale::Ja).is_empty());
            assert!(!callback_error_message(code, Locale::En).is_empty());
        }
    }
}
