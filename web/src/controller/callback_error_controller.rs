use crate::params::callback_error::ErrorPageParams;
use crate::AppState;
use auth_callback::callback::sanitize_provider_code;
use auth_callback::messages::Locale;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};

use log::*;

const MAX_ERROR_LEN: usize = 300;

const OTP_EXPIRED: &str = "otp_expired";
const BAD_CODE_VERIFIER: &str = "bad_code_verifier";

struct PageText {
    title: &'static str,
    apology: &'static str,
    error_label: &'static str,
    code_label: &'static str,
    tips_header: &'static str,
    tips: [&'static str; 3],
    sign_out_of_google: &'static str,
    link_expired: &'static str,
    back_to_sign_in: &'static str,
}

const JA: PageText = PageText {
    title: "認証エラー",
    apology: "申し訳ありません。認証中にエラーが発生しました。もう一度お試しください。",
    error_label: "エラー",
    code_label: "コード",
    tips_header: "以下の対処法をお試しください：",
    tips: [
        "ブラウザのキャッシュとCookieをクリアしてから再試行",
        "別のブラウザで試す",
        "プライベートウィンドウ（シークレットモード）で試す",
    ],
    sign_out_of_google: "Googleアカウントからログアウトして再度試す",
    link_expired: "認証リンクの有効期限が切れています。新しいリンクを再送信してください。",
    back_to_sign_in: "ログインページに戻る",
};

const EN: PageText = PageText {
    title: "Authentication error",
    apology: "Sorry, something went wrong while signing you in. Please try again.",
    error_label: "Error",
    code_label: "Code",
    tips_header: "Things to try:",
    tips: [
        "Clear your browser cache and cookies, then retry",
        "Try a different browser",
        "Try a private (incognito) window",
    ],
    sign_out_of_google: "Sign out of your Google account and try again",
    link_expired: "The sign-in link has expired. Please request a new one.",
    back_to_sign_in: "Back to the sign-in page",
};

/// GET the page a failed callback redirects to. Plain text, so nothing the
/// browser sent back can be interpreted as markup.
pub async fn error_page(
    State(app_state): State<AppState>,
    Query(params): Query<ErrorPageParams>,
) -> impl IntoResponse {
    debug!(
        "Rendering callback error page for {:?} / {:?}",
        params.error_code, params.code
    );

    render(
        app_state.config.message_locale,
        &params,
        &app_state.config.guard_paths().sign_in_path,
    )
}

fn render(locale: Locale, params: &ErrorPageParams, sign_in_path: &str) -> String {
    let text = match locale {
        Locale::Ja => &JA,
        Locale::En => &EN,
    };
    let error = params.error.as_deref().map(clean_message).filter(|e| !e.is_empty());
    let code = params.code.as_deref().and_then(sanitize_provider_code);

    let mut lines = vec![text.title.to_string(), String::new(), text.apology.to_string(), String::new()];
    if let Some(error) = &error {
        lines.push(format!("{}: {}", text.error_label, error));
    }
    if let Some(code) = &code {
        lines.push(format!("{}: {}", text.code_label, code));
    }

    lines.push(String::new());
    lines.push(text.tips_header.to_string());
    lines.extend(text.tips.iter().map(|tip| format!("- {}", tip)));

    match code.as_deref() {
        Some(OTP_EXPIRED) => {
            lines.push(String::new());
            lines.push(text.link_expired.to_string());
        }
        Some(BAD_CODE_VERIFIER) => {
            lines.push(format!("- {}", text.sign_out_of_google));
            lines.push(String::new());
            lines.push(format!("{}: {}", text.back_to_sign_in, sign_in_path));
        }
        _ => {}
    }

    let mut page = lines.join("\n");
    page.push('\n');
    page
}

/// Drop control characters and cap the length of a browser-supplied message.
fn clean_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_ERROR_LEN)
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(error: Option<&str>, code: Option<&str>) -> ErrorPageParams {
        ErrorPageParams {
            error_code: Some("EXCHANGE_ERROR".to_string()),
            code: code.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_japanese_page_lists_error_and_tips() {
        let page = render(
            Locale::Ja,
            &params(Some("Invalid grant"), Some("invalid_grant")),
            "/",
        );

        assert!(page.starts_with("認証エラー"));
        assert!(page.contains("エラー: Invalid grant"));
        assert!(page.contains("コード: invalid_grant"));
        assert!(page.contains("- 別のブラウザで試す"));
        assert!(!page.contains("Googleアカウント"));
    }

    #[test]
    fn test_bad_code_verifier_adds_google_tip_and_sign_in_link() {
        let page = render(Locale::Ja, &params(None, Some("bad_code_verifier")), "/auth/sign-in");

        assert!(page.contains("- Googleアカウントからログアウトして再度試す"));
        assert!(page.contains("ログインページに戻る: /auth/sign-in"));
        assert!(!page.contains("エラー: "));
    }

    #[test]
    fn test_expired_link_is_explained() {
        let page = render(Locale::En, &params(Some("Email link is invalid or has expired"), Some("otp_expired")), "/");

        assert!(page.contains("The sign-in link has expired"));
        assert!(page.contains("Code: otp_expired"));
    }

    #[test]
    fn test_page_layout() {
        let page = render(Locale::En, &params(Some("Invalid grant"), None), "/");

        assert!(page.starts_with("Authentication error\n\nSorry,"));
        assert!(page.contains("Error: Invalid grant\n\nThings to try:\n- Clear"));
        assert!(page.ends_with("- Try a private (incognito) window\n"));
    }

    #[test]
    fn test_untrusted_values_are_sanitized() {
        let long = "x".repeat(1000);
        let page = render(
            Locale::En,
            &params(Some(&format!("line\r\nSet-Cookie: a=b{}", long)), Some("<>")),
            "/",
        );

        assert!(!page.contains("\r"));
        assert!(page.contains("Error: lineSet-Cookie: a=b"));
        assert!(!page.contains("Code:"));
        assert!(!page.contains(&"x".repeat(MAX_ERROR_LEN)));
    }
}
