//! Cookie store trait for reading and writing request cookies.

use super::CookieDomain;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// Attributes applied when a cookie is written or removed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CookieOptions {
    /// `Domain` attribute; `None` keeps the cookie host-only.
    pub domain: Option<String>,
    pub path: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    /// Lifetime in seconds.
    pub max_age: Option<i64>,
}

impl CookieOptions {
    /// Options shared by every cookie written during one callback response.
    ///
    /// `SameSite=None` is required because the identity provider redirects back
    /// cross-site, and browsers only accept it together with `Secure`.
    pub fn for_domain(domain: &CookieDomain) -> Self {
        Self {
            domain: domain.attribute().map(str::to_owned),
            path: Some("/".to_string()),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::None),
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }
}

/// Trait for the caller-supplied cookie jar.
///
/// Implementations read from the inbound request and collect writes for the
/// outbound response. Deleting a cookie must use the same domain and path it
/// was written with, otherwise browsers keep the original.
pub trait CookieStore {
    /// Current value of the named cookie, if the request carried it.
    fn get(&self, name: &str) -> Option<String>;

    /// Write a cookie to the response.
    fn set(&mut self, name: &str, value: &str, options: &CookieOptions);

    /// Remove a cookie from the browser.
    fn delete(&mut self, name: &str, options: &CookieOptions);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_for_shared_domain() {
        let options = CookieOptions::for_domain(&CookieDomain::Shared(".example.com".to_string()));
        assert_eq!(options.domain.as_deref(), Some(".example.com"));
        assert_eq!(options.path.as_deref(), Some("/"));
        assert!(options.secure);
        assert!(options.http_only);
        assert_eq!(options.same_site, Some(SameSite::None));
        assert_eq!(options.max_age, None);
    }

    #[test]
    fn test_options_for_host_only_domain_omit_attribute() {
        let options = CookieOptions::for_domain(&CookieDomain::HostOnly("localhost:3000".to_string()));
        assert!(options.domain.is_none());
    }

    #[test]
    fn test_with_max_age() {
        let options = CookieOptions::default().with_max_age(604_800);
        assert_eq!(options.max_age, Some(604_800));
    }
}
