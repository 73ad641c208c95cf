//! Redirect target validation.
//!
//! A post-login redirect is honored only when its origin (scheme, host and
//! port) exactly matches an allow-listed origin. Paths and query strings are
//! never compared.

use tracing::{debug, warn};
use url::Url;

/// Origins the application redirects to after authentication.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://saedgewell.test",
    "http://docs.saedgewell.test",
    "http://admin.saedgewell.test",
    "https://saedgewell.test",
    "https://docs.saedgewell.test",
    "https://admin.saedgewell.test",
    "https://saedgewell.net",
    "https://docs.saedgewell.net",
    "https://admin.saedgewell.net",
];

/// Returns `true` when `candidate` parses as an absolute URL whose origin
/// equals the origin of some entry in `allow_list`.
///
/// Unparseable candidates are rejected; unparseable allow-list entries are
/// skipped.
pub fn is_allowed<S: AsRef<str>>(candidate: &str, allow_list: &[S]) -> bool {
    let candidate_origin = match Url::parse(candidate) {
        Ok(url) => url.origin(),
        Err(e) => {
            debug!("Rejecting unparseable redirect target {:?}: {}", candidate, e);
            return false;
        }
    };

    // Opaque origins (data:, javascript:, file:) never equal anything.
    if !candidate_origin.is_tuple() {
        return false;
    }

    let allowed = allow_list.iter().any(|entry| match Url::parse(entry.as_ref()) {
        Ok(url) => url.origin() == candidate_origin,
        Err(_) => {
            warn!("Skipping invalid allow-list entry {:?}", entry.as_ref());
            false
        }
    });

    if !allowed {
        warn!("Redirect target {} is not in the allow-list", candidate);
    }
    allowed
}

/// `true` for same-origin paths like `/dashboard?tab=1`.
///
/// Protocol-relative (`//evil.com`) and backslash (`/\evil.com`) forms are
/// rejected because browsers resolve them to another host.
pub fn is_safe_relative_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

/// Configured set of allowed redirect origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectAllowList(Vec<String>);

impl RedirectAllowList {
    pub fn new(origins: Vec<String>) -> Self {
        Self(origins)
    }

    pub fn is_allowed(&self, candidate: &str) -> bool {
        is_allowed(candidate, self.0.as_slice())
    }

    pub fn origins(&self) -> &[String] {
        &self.0
    }
}

impl Default for RedirectAllowList {
    fn default() -> Self {
        Self(DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect())
    }
}
