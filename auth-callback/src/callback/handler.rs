//! Callback orchestration.
//!
//! Every evaluation resolves the cookie domain once, runs one of the entry
//! paths to a terminal [`CallbackOutcome`], then removes the PKCE cookies with
//! that same domain. No path retries a backend call.

use tracing::{debug, error, info, warn};
use url::Url;

use super::outcome::{CallbackErrorCode, CallbackOutcome};
use super::pkce::{self, CODE_VERIFIER_COOKIE, REDIRECT_TO_COOKIE, STATE_COOKIE};
use super::request::{CallbackRequest, DEFAULT_FALLBACK_HOST};
use crate::backend::{IdentityBackend, OtpType, Session};
use crate::cookie::{encode_session, CookieDomainResolver, CookieOptions, CookieStore, SessionCookieSettings};
use crate::error::Error;
use crate::messages::{auth_error_message, callback_error_message, is_verifier_error, Locale};
use crate::redirect::{is_safe_relative_path, RedirectAllowList};

/// Default landing page after a successful login.
pub const DEFAULT_REDIRECT_PATH: &str = "/";
/// Default error page for failed callbacks.
pub const DEFAULT_ERROR_PATH: &str = "/auth/callback/error";

/// Operator configuration for the callback orchestrator.
#[derive(Debug, Clone)]
pub struct CallbackSettings {
    pub default_redirect_path: String,
    pub error_path: String,
    pub allow_list: RedirectAllowList,
    pub cookie_domains: CookieDomainResolver,
    pub session_cookie: SessionCookieSettings,
    pub locale: Locale,
    /// Host assumed when the request has no `Host` header.
    pub fallback_host: String,
}

impl Default for CallbackSettings {
    fn default() -> Self {
        Self {
            default_redirect_path: DEFAULT_REDIRECT_PATH.to_string(),
            error_path: DEFAULT_ERROR_PATH.to_string(),
            allow_list: RedirectAllowList::default(),
            cookie_domains: CookieDomainResolver::default(),
            session_cookie: SessionCookieSettings::default(),
            locale: Locale::default(),
            fallback_host: DEFAULT_FALLBACK_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryPath {
    /// Pick the path from the request parameters.
    Detect,
    /// Always run the state-checked PKCE redirect path.
    Pkce,
}

/// Evaluates identity provider callbacks against an [`IdentityBackend`].
pub struct CallbackHandler<B> {
    backend: B,
    settings: CallbackSettings,
}

impl<B: IdentityBackend> CallbackHandler<B> {
    pub fn new(backend: B, settings: CallbackSettings) -> Self {
        Self { backend, settings }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &CallbackSettings {
        &self.settings
    }

    /// Evaluate a callback request, choosing the entry path from its parameters:
    ///
    /// 1. `error` without `code`: the provider refused the login
    /// 2. `state`: PKCE redirect checked against the state cookie
    /// 3. `code`: direct code exchange
    /// 4. `token_hash` and `type`: emailed token verification
    /// 5. anything else is an invalid request
    pub async fn handle<C>(&self, request: &CallbackRequest, cookies: &mut C) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        self.run(request, cookies, EntryPath::Detect).await
    }

    /// Evaluate a callback that must come from the PKCE browser redirect.
    /// A missing `state` parameter is a [`CallbackErrorCode::StateError`].
    pub async fn handle_oauth<C>(&self, request: &CallbackRequest, cookies: &mut C) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        self.run(request, cookies, EntryPath::Pkce).await
    }

    /// Outcome for a request that could not even be parsed. PKCE cookies are
    /// still removed.
    pub fn reject_invalid_request<C>(&self, host: &str, cookies: &mut C) -> CallbackOutcome
    where
        C: CookieStore + ?Sized,
    {
        let options = self.cookie_options(host);
        pkce::clear(cookies, &options);
        let outcome = self.fail(CallbackErrorCode::UnknownError);
        warn!("Rejected malformed callback request for host {}", host);
        outcome
    }

    async fn run<C>(&self, request: &CallbackRequest, cookies: &mut C, entry: EntryPath) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        let options = self.cookie_options(request.host());

        let outcome = match entry {
            EntryPath::Pkce => self.pkce_redirect(request, cookies, &options).await,
            EntryPath::Detect => self.detect_and_evaluate(request, cookies, &options).await,
        };

        pkce::clear(cookies, &options);

        match &outcome {
            CallbackOutcome::Success { next_path } => {
                info!("Auth callback succeeded, redirecting to {}", next_path)
            }
            CallbackOutcome::Error {
                error_code, message, ..
            } => warn!("Auth callback failed with {}: {}", error_code, message),
        }
        outcome
    }

    fn cookie_options(&self, host: &str) -> CookieOptions {
        let domain = self.settings.cookie_domains.resolve(host);
        debug!("Using cookie domain {:?} for host {}", domain, host);
        CookieOptions::for_domain(&domain)
    }

    async fn detect_and_evaluate<C>(
        &self,
        request: &CallbackRequest,
        cookies: &mut C,
        options: &CookieOptions,
    ) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        let code = request.code();

        if let (Some(error), None) = (request.error(), code.as_deref()) {
            let description = request.error_description().unwrap_or_else(|| error.clone());
            warn!("Identity provider reported {}: {}", error, description);
            let message = auth_error_message(&description, Some(error.as_str()), self.settings.locale);
            return self.fail_with(CallbackErrorCode::OauthError, message, Some(error.as_str()));
        }

        if request.state().is_some() {
            return self.pkce_redirect(request, cookies, options).await;
        }

        if let Some(code) = code {
            return self.exchange_code(request, &code, cookies, options).await;
        }

        if let (Some(token_hash), Some(otp_type)) = (request.token_hash(), request.otp_type()) {
            return self
                .verify_token_hash(request, &token_hash, &otp_type, cookies, options)
                .await;
        }

        warn!("Callback request carried neither code nor token hash");
        self.fail(CallbackErrorCode::UnknownError)
    }

    async fn pkce_redirect<C>(
        &self,
        request: &CallbackRequest,
        cookies: &mut C,
        options: &CookieOptions,
    ) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        let Some(state) = request.state() else {
            return self.fail(CallbackErrorCode::StateError);
        };

        if cookies.get(STATE_COOKIE).as_deref() != Some(state.as_str()) {
            warn!("OAuth state does not match the state cookie");
            return self.fail(CallbackErrorCode::StateMismatch);
        }

        let Some(code) = request.code() else {
            return self.fail(CallbackErrorCode::CodeError);
        };

        let Some(code_verifier) = cookies.get(CODE_VERIFIER_COOKIE) else {
            return self.fail(CallbackErrorCode::CodeVerifierError);
        };

        let session = match self
            .backend
            .exchange_code_for_session(&code, Some(code_verifier.as_str()))
            .await
        {
            Ok(Some(session)) => session,
            Ok(None) => {
                error!("No session returned after code exchange");
                return self.fail(CallbackErrorCode::SessionError);
            }
            Err(e) => return self.exchange_failure(e),
        };

        if let Err(outcome) = self.store_session(&session, cookies, options) {
            return outcome;
        }

        let Some(redirect_to) = cookies.get(REDIRECT_TO_COOKIE) else {
            return self.fail(CallbackErrorCode::RedirectError);
        };

        if !self.settings.allow_list.is_allowed(&redirect_to) {
            return self.fail(CallbackErrorCode::InvalidRedirect);
        }

        CallbackOutcome::success(redirect_to)
    }

    async fn exchange_code<C>(
        &self,
        request: &CallbackRequest,
        code: &str,
        cookies: &mut C,
        options: &CookieOptions,
    ) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        let code_verifier = cookies.get(CODE_VERIFIER_COOKIE);

        let session = match self
            .backend
            .exchange_code_for_session(code, code_verifier.as_deref())
            .await
        {
            Ok(Some(session)) => session,
            Ok(None) => {
                error!("No session returned after code exchange");
                return self.fail(CallbackErrorCode::SessionError);
            }
            Err(e) => return self.exchange_failure(e),
        };

        if let Err(outcome) = self.store_session(&session, cookies, options) {
            return outcome;
        }

        CallbackOutcome::success(self.next_path(request))
    }

    async fn verify_token_hash<C>(
        &self,
        request: &CallbackRequest,
        token_hash: &str,
        otp_type: &str,
        cookies: &mut C,
        options: &CookieOptions,
    ) -> CallbackOutcome
    where
        C: CookieStore + Send,
    {
        let Ok(otp_type) = otp_type.parse::<OtpType>() else {
            warn!("Unsupported token type {:?}", otp_type);
            return self.fail(CallbackErrorCode::UnknownError);
        };

        match self.backend.verify_otp(otp_type, token_hash).await {
            Ok(Some(session)) => {
                if let Err(outcome) = self.store_session(&session, cookies, options) {
                    return outcome;
                }
            }
            Ok(None) => warn!("Token hash verified but no session was issued"),
            Err(e) => return self.exchange_failure(e),
        }

        CallbackOutcome::success(self.next_path(request))
    }

    /// Map a failed exchange or verification to an outcome. Provider
    /// rejections keep the provider's code and message; anything else only
    /// surfaces a specific code when it looks like a stale verifier.
    fn exchange_failure(&self, e: Error) -> CallbackOutcome {
        let locale = self.settings.locale;

        if let Some(provider) = e.provider_error() {
            error!("Identity backend rejected callback: {}", provider);
            let message = auth_error_message(&provider.message, provider.code.as_deref(), locale);
            return self.fail_with(CallbackErrorCode::ExchangeError, message, provider.code.as_deref());
        }

        let detail = e.detail();
        error!("Unexpected error during callback: {}", e);

        if is_verifier_error(&detail) {
            let message = auth_error_message(&detail, None, locale);
            return self.fail_with(CallbackErrorCode::CodeVerifierError, message, None);
        }

        self.fail(CallbackErrorCode::UnknownError)
    }

    fn store_session<C>(
        &self,
        session: &Session,
        cookies: &mut C,
        options: &CookieOptions,
    ) -> Result<(), CallbackOutcome>
    where
        C: CookieStore + ?Sized,
    {
        let value = encode_session(session).map_err(|e| {
            error!("Failed to encode session cookie: {}", e);
            self.fail(CallbackErrorCode::SessionError)
        })?;

        let session_cookie = &self.settings.session_cookie;
        let options = options.clone().with_max_age(session_cookie.max_age);
        cookies.set(&session_cookie.name, &value, &options);
        Ok(())
    }

    fn next_path(&self, request: &CallbackRequest) -> String {
        resolve_next_path(request.next().as_deref(), &self.settings.default_redirect_path)
    }

    fn fail(&self, error_code: CallbackErrorCode) -> CallbackOutcome {
        let message = callback_error_message(error_code, self.settings.locale);
        self.fail_with(error_code, message, None)
    }

    fn fail_with(
        &self,
        error_code: CallbackErrorCode,
        message: impl Into<String>,
        provider_code: Option<&str>,
    ) -> CallbackOutcome {
        CallbackOutcome::error(&self.settings.error_path, error_code, message, provider_code)
    }
}

/// Resolve the post-login path from a `next`/`callback` value.
///
/// Absolute URLs contribute their own `next` parameter, or else their path.
/// Only same-origin relative paths are honored; everything else becomes
/// `default_path`.
pub fn resolve_next_path(next: Option<&str>, default_path: &str) -> String {
    let Some(next) = next else {
        return default_path.to_string();
    };

    let candidate = if is_safe_relative_path(next) {
        next.to_string()
    } else {
        match Url::parse(next) {
            Ok(url) => url
                .query_pairs()
                .find(|(key, value)| key == "next" && !value.is_empty())
                .map(|(_, value)| value.into_owned())
                .unwrap_or_else(|| url.path().to_string()),
            Err(_) => {
                debug!("Ignoring unparseable next target {:?}", next);
                return default_path.to_string();
            }
        }
    };

    if is_safe_relative_path(&candidate) {
        candidate
    } else {
        debug!("Ignoring unsafe next target {:?}", candidate);
        default_path.to_string()
    }
}
