//! Bridges the callback pipeline's cookie store onto axum-extra's `CookieJar`.

use auth_callback::cookie::{decode_access_token, CookieOptions, CookieStore, SameSite};
use axum_extra::extract::cookie::{self, Cookie, CookieJar};
use secrecy::SecretString;
use time::Duration;

/// Cookie store backed by the request's jar. Writes become `Set-Cookie`
/// headers once the jar is returned as part of the response.
#[derive(Debug, Default)]
pub(crate) struct JarCookieStore {
    jar: CookieJar,
}

impl JarCookieStore {
    pub(crate) fn new(jar: CookieJar) -> Self {
        Self { jar }
    }

    pub(crate) fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl CookieStore for JarCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_string())
    }

    fn set(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let cookie = build_cookie(name, value, options);
        self.jar = std::mem::take(&mut self.jar).add(cookie);
    }

    fn delete(&mut self, name: &str, options: &CookieOptions) {
        // The removal cookie must carry the domain and path the cookie was set with
        let cookie = build_cookie(name, "", options);
        self.jar = std::mem::take(&mut self.jar).remove(cookie);
    }
}

fn build_cookie(name: &str, value: &str, options: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_owned(), value.to_owned()))
        .secure(options.secure)
        .http_only(options.http_only);

    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(path) = &options.path {
        builder = builder.path(path.clone());
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(match same_site {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        });
    }
    if let Some(max_age) = options.max_age {
        builder = builder.max_age(Duration::seconds(max_age));
    }

    builder.build()
}

/// Access token of the session cookie named `name`, if the request carries a
/// readable one.
pub(crate) fn session_access_token(jar: &CookieJar, name: &str) -> Option<SecretString> {
    jar.get(name)
        .and_then(|cookie| decode_access_token(cookie.value()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_callback::cookie::CookieDomain;
    use axum::http::{header, HeaderMap, HeaderValue};
    use axum::response::IntoResponse;

    fn jar_with(cookies: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookies).unwrap());
        CookieJar::from_headers(&headers)
    }

    fn set_cookie_headers(store: JarCookieStore) -> Vec<String> {
        let response = store.into_jar().into_response();
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    fn shared_options() -> CookieOptions {
        CookieOptions::for_domain(&CookieDomain::Shared(".saedgewell.net".to_string()))
    }

    #[test]
    fn test_get_reads_request_cookies() {
        let store = JarCookieStore::new(jar_with("sb-oauth-state=abc; other=1"));

        assert_eq!(store.get("sb-oauth-state").as_deref(), Some("abc"));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_set_emits_cookie_with_all_attributes() {
        let mut store = JarCookieStore::default();
        store.set("sb-auth-token", "base64-xyz", &shared_options().with_max_age(604_800));

        let headers = set_cookie_headers(store);
        assert_eq!(headers.len(), 1);
        let set_cookie = &headers[0];
        assert!(set_cookie.starts_with("sb-auth-token=base64-xyz"));
        assert!(set_cookie.contains("saedgewell.net"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Secure"));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=None"));
        assert!(set_cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_delete_expires_cookie_sent_by_browser() {
        let mut store = JarCookieStore::new(jar_with("sb-oauth-state=abc"));
        store.delete("sb-oauth-state", &shared_options());

        let headers = set_cookie_headers(store);
        assert_eq!(headers.len(), 1);
        assert!(headers[0].starts_with("sb-oauth-state="));
        assert!(headers[0].contains("Max-Age=0"));
        assert!(headers[0].contains("saedgewell.net"));
    }

    #[test]
    fn test_delete_of_absent_cookie_writes_nothing() {
        let mut store = JarCookieStore::default();
        store.delete("sb-oauth-state", &shared_options());

        assert!(set_cookie_headers(store).is_empty());
    }

    #[test]
    fn test_session_access_token_ignores_unreadable_cookie() {
        let jar = jar_with("sb-auth-token=not-a-session");
        assert!(session_access_token(&jar, "sb-auth-token").is_none());
        assert!(session_access_token(&CookieJar::new(), "sb-auth-token").is_none());
    }
}
