//! GoTrue-compatible REST implementation of [`IdentityBackend`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    access_token_assurance_level, assurance_levels_for, AssuranceLevels, IdentityBackend, OtpType,
    Session, User,
};
use crate::error::{rejected, Error, ProviderError};

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    otp_type: OtpType,
    token_hash: &'a str,
}

#[derive(Debug, Serialize)]
struct PkceTokenRequest<'a> {
    auth_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_verifier: Option<&'a str>,
}

/// Error body shapes returned by the identity backend. Newer releases send
/// `error_code` + `msg` with a numeric `code`; older ones use OAuth-style
/// `error` + `error_description`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_provider_error(self, status: u16) -> ProviderError {
        let code = self
            .error_code
            .or_else(|| match self.code {
                Some(Value::String(code)) => Some(code),
                _ => None,
            })
            .or_else(|| self.error.clone());

        let message = self
            .msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("Identity backend returned HTTP {}", status));

        let provider = ProviderError::new(message).with_status(status);
        match code {
            Some(code) => provider.with_code(code),
            None => provider,
        }
    }
}

/// Build the shared HTTP client used for every identity backend call.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .user_agent(format!("auth-callback/{}", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// REST client for the identity backend, scoped to one inbound request.
///
/// The `reqwest::Client` is shared; constructing one of these per request is
/// cheap. Session-bound calls (`get_user`, `authenticator_assurance_level`)
/// use the access token taken from the request's session cookie.
pub struct HttpIdentityBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    access_token: Option<SecretString>,
    suppress_context_warning: AtomicBool,
}

impl HttpIdentityBackend {
    pub fn new(base_url: &str, anon_key: SecretString, timeout: Duration) -> Result<Self, Error> {
        Ok(Self::from_client(build_client(timeout)?, base_url, anon_key))
    }

    pub fn from_client(client: reqwest::Client, base_url: &str, anon_key: SecretString) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
            access_token: None,
            suppress_context_warning: AtomicBool::new(false),
        }
    }

    /// Attach the access token of the session making the current request.
    pub fn with_access_token(mut self, access_token: Option<SecretString>) -> Self {
        self.access_token = access_token;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn warn_missing_context(&self, operation: &str) {
        if !self.suppress_context_warning.load(Ordering::SeqCst) {
            warn!(
                "{} called without a session access token; treating the request as anonymous",
                operation
            );
        }
    }

    async fn post_for_session<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Option<Session>, Error> {
        let response = self
            .client
            .post(url)
            .header("apikey", self.anon_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!("Identity backend request to {} failed: {:?}", url, e);
                Error::from(e)
            })?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let body: Value = response.json().await?;
        if body.get("access_token").is_none() {
            debug!("Identity backend response carried no session");
            return Ok(None);
        }

        let session: Session = serde_json::from_value(body)?;
        Ok(Some(session))
    }
}

async fn rejection(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let provider = body.into_provider_error(status);
    warn!("Identity backend rejected request: {}", provider);
    rejected(provider)
}

#[async_trait]
impl IdentityBackend for HttpIdentityBackend {
    async fn verify_otp(&self, otp_type: OtpType, token_hash: &str) -> Result<Option<Session>, Error> {
        debug!("Verifying {} token hash", otp_type);
        let request = VerifyRequest {
            otp_type,
            token_hash,
        };
        let session = self.post_for_session(&self.endpoint("verify"), &request).await?;
        if session.is_some() {
            info!("Token hash verified");
        }
        Ok(session)
    }

    async fn exchange_code_for_session(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<Option<Session>, Error> {
        debug!("Exchanging authorization code for session");
        let request = PkceTokenRequest {
            auth_code: code,
            code_verifier,
        };
        let url = format!("{}?grant_type=pkce", self.endpoint("token"));
        let session = self.post_for_session(&url, &request).await?;
        if session.is_some() {
            info!("Authorization code exchanged for session");
        }
        Ok(session)
    }

    async fn authenticator_assurance_level(&self) -> Result<AssuranceLevels, Error> {
        let Some(access_token) = &self.access_token else {
            self.warn_missing_context("authenticator_assurance_level");
            return Ok(AssuranceLevels::default());
        };

        let current_level = access_token_assurance_level(access_token.expose_secret());
        let levels = match self.get_user().await? {
            Some(user) => assurance_levels_for(current_level, &user),
            None => AssuranceLevels {
                current_level,
                next_level: current_level,
            },
        };
        debug!("Assurance levels: {:?}", levels);
        Ok(levels)
    }

    async fn get_user(&self) -> Result<Option<User>, Error> {
        let Some(access_token) = &self.access_token else {
            self.warn_missing_context("get_user");
            return Ok(None);
        };

        let url = self.endpoint("user");
        let response = self
            .client
            .get(&url)
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Identity backend request to {} failed: {:?}", url, e);
                Error::from(e)
            })?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json::<User>().await?)),
            reqwest::StatusCode::UNAUTHORIZED => {
                debug!("Access token no longer valid");
                Ok(None)
            }
            _ => Err(rejection(response).await),
        }
    }

    fn set_suppress_context_warning(&self, suppress: bool) -> bool {
        self.suppress_context_warning.swap(suppress, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::token_with_aal;
    use crate::backend::AssuranceLevel;
    use crate::error::{BackendErrorKind, ErrorKind};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn backend(url: &str) -> HttpIdentityBackend {
        HttpIdentityBackend::new(url, SecretString::new("anon-key".to_string()), Duration::from_secs(5))
            .unwrap()
    }

    fn session_body(aal: &str) -> String {
        json!({
            "access_token": token_with_aal(aal),
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 1_900_000_000,
            "user": {"id": "user-1", "email": "admin@example.com", "factors": null}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_exchange_code_posts_pkce_grant() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_query(Matcher::UrlEncoded("grant_type".into(), "pkce".into()))
            .match_header("apikey", "anon-key")
            .match_body(Matcher::Json(json!({
                "auth_code": "code-1",
                "code_verifier": "verifier-1"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(session_body("aal1"))
            .create_async()
            .await;

        let session = backend(&server.url())
            .exchange_code_for_session("code-1", Some("verifier-1"))
            .await
            .unwrap()
            .expect("session");

        assert_eq!(session.expires_at, Some(1_900_000_000));
        assert_eq!(session.user.unwrap().id, "user-1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_exchange_rejection_maps_provider_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(
                json!({
                    "code": 400,
                    "error_code": "bad_code_verifier",
                    "msg": "code challenge does not match previously saved code verifier"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = backend(&server.url())
            .exchange_code_for_session("code-1", Some("wrong"))
            .await
            .unwrap_err();

        let provider = err.provider_error().expect("rejection");
        assert_eq!(provider.code.as_deref(), Some("bad_code_verifier"));
        assert_eq!(provider.status, Some(400));
        assert!(provider.message.contains("code verifier"));
    }

    #[tokio::test]
    async fn test_legacy_oauth_error_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/verify")
            .with_status(403)
            .with_body(r#"{"error":"invalid_grant","error_description":"Token has expired"}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .verify_otp(OtpType::Magiclink, "hash-1")
            .await
            .unwrap_err();

        let provider = err.provider_error().unwrap();
        assert_eq!(provider.code.as_deref(), Some("invalid_grant"));
        assert_eq!(provider.message, "Token has expired");
    }

    #[tokio::test]
    async fn test_unparseable_error_body_still_rejects() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/verify")
            .with_status(502)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let err = backend(&server.url())
            .verify_otp(OtpType::Email, "hash-1")
            .await
            .unwrap_err();

        let provider = err.provider_error().unwrap();
        assert_eq!(provider.code, None);
        assert_eq!(provider.message, "Identity backend returned HTTP 502");
    }

    #[tokio::test]
    async fn test_verify_sends_type_and_hash() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/verify")
            .match_body(Matcher::Json(json!({"type": "email_change", "token_hash": "hash-1"})))
            .with_status(200)
            .with_body(session_body("aal1"))
            .create_async()
            .await;

        let session = backend(&format!("{}/", server.url()))
            .verify_otp(OtpType::EmailChange, "hash-1")
            .await
            .unwrap();

        assert!(session.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_success_without_session_is_none() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/verify")
            .with_status(200)
            .with_body(r#"{"id":"user-1"}"#)
            .create_async()
            .await;

        let session = backend(&server.url())
            .verify_otp(OtpType::Signup, "hash-1")
            .await
            .unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn test_network_failure_is_not_a_rejection() {
        let err = backend("http://127.0.0.1:1")
            .exchange_code_for_session("code-1", None)
            .await
            .unwrap_err();

        assert!(err.provider_error().is_none());
        assert_eq!(err.error_kind, ErrorKind::Backend(BackendErrorKind::Network));
        assert!(!err.detail().contains("grant_type"));
    }

    #[tokio::test]
    async fn test_get_user_without_token_is_anonymous() {
        let server = Server::new_async().await;
        let backend = backend(&server.url());

        assert_eq!(backend.get_user().await.unwrap(), None);
        assert_eq!(
            backend.authenticator_assurance_level().await.unwrap(),
            AssuranceLevels::default()
        );
    }

    #[tokio::test]
    async fn test_get_user_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/user")
            .match_header("authorization", "Bearer token-1")
            .match_header("apikey", "anon-key")
            .with_status(200)
            .with_body(r#"{"id":"user-1","email":"admin@example.com"}"#)
            .create_async()
            .await;

        let user = backend(&server.url())
            .with_access_token(Some(SecretString::new("token-1".to_string())))
            .get_user()
            .await
            .unwrap()
            .expect("user");

        assert_eq!(user.email.as_deref(), Some("admin@example.com"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_user_with_expired_token_is_none() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/user")
            .with_status(401)
            .with_body(r#"{"code":401,"error_code":"bad_jwt","msg":"invalid JWT"}"#)
            .create_async()
            .await;

        let user = backend(&server.url())
            .with_access_token(Some(SecretString::new("expired".to_string())))
            .get_user()
            .await
            .unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_assurance_levels_combine_token_and_factors() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/user")
            .with_status(200)
            .with_body(
                json!({
                    "id": "user-1",
                    "factors": [{"id": "f1", "factor_type": "totp", "status": "verified"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let levels = backend(&server.url())
            .with_access_token(Some(SecretString::new(token_with_aal("aal1"))))
            .authenticator_assurance_level()
            .await
            .unwrap();

        assert_eq!(levels.current_level, Some(AssuranceLevel::Aal1));
        assert_eq!(levels.next_level, Some(AssuranceLevel::Aal2));
    }

    #[test]
    fn test_suppress_flag_returns_previous_value() {
        let backend = backend("http://localhost");
        assert!(!backend.set_suppress_context_warning(true));
        assert!(backend.set_suppress_context_warning(false));
        assert!(!backend.set_suppress_context_warning(false));
    }
}
