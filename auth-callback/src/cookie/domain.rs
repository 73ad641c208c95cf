//! Cookie domain resolution.
//!
//! Session cookies must be shared between the admin, docs and web subdomains,
//! so the `Domain` attribute is derived from the request host. The result is
//! computed once per response and reused for every cookie written or deleted
//! in that response.

use std::net::IpAddr;

use tracing::{debug, warn};

/// Development domain whose subdomains all share cookies.
pub const DEFAULT_DEV_SUFFIX: &str = "saedgewell.test";

/// Resolved cookie scope for a single response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDomain {
    /// Rendered as the cookie's `Domain` attribute (e.g. `.example.com`).
    Shared(String),
    /// No `Domain` attribute; the cookie stays bound to the exact host.
    HostOnly(String),
}

impl CookieDomain {
    /// The resolved value, with or without a leading dot.
    pub fn as_str(&self) -> &str {
        match self {
            CookieDomain::Shared(domain) => domain,
            CookieDomain::HostOnly(host) => host,
        }
    }

    /// Value for the cookie `Domain` attribute, `None` when it must be omitted.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            CookieDomain::Shared(domain) => Some(domain),
            CookieDomain::HostOnly(_) => None,
        }
    }
}

/// Operator configuration for cookie domain resolution.
#[derive(Debug, Clone)]
pub struct CookieDomainResolver {
    override_domain: Option<String>,
    dev_suffix: String,
}

impl CookieDomainResolver {
    pub fn new(dev_suffix: impl Into<String>) -> Self {
        Self {
            override_domain: None,
            dev_suffix: dev_suffix.into(),
        }
    }

    /// Set an explicit domain that takes precedence over host-based derivation.
    pub fn with_override(mut self, override_domain: Option<String>) -> Self {
        self.override_domain = override_domain.filter(|domain| !domain.trim().is_empty());
        self
    }

    pub fn resolve(&self, host: &str) -> CookieDomain {
        resolve(host, self.override_domain.as_deref(), &self.dev_suffix)
    }
}

impl Default for CookieDomainResolver {
    fn default() -> Self {
        Self::new(DEFAULT_DEV_SUFFIX)
    }
}

/// Resolve the cookie domain for `host`.
///
/// Precedence:
/// 1. `override_domain`, verbatim
/// 2. any host under the development suffix → `.<dev_suffix>`
/// 3. `localhost` / `localhost:<port>` → host unchanged, no `Domain` attribute
/// 4. two labels (`example.com`) → `.example.com`
/// 5. three or more labels (`sub.example.com`) → leftmost label stripped, `.example.com`
/// 6. anything else → host unchanged, no `Domain` attribute, logged as an anomaly
pub fn resolve(host: &str, override_domain: Option<&str>, dev_suffix: &str) -> CookieDomain {
    if let Some(domain) = override_domain {
        debug!("Using configured cookie domain {}", domain);
        return CookieDomain::Shared(domain.to_string());
    }

    if host == "localhost" || host.starts_with("localhost:") {
        debug!("Localhost detected ({}), omitting cookie domain", host);
        return CookieDomain::HostOnly(host.to_string());
    }

    let hostname = strip_port(host).to_ascii_lowercase();

    let dev_suffix = dev_suffix.trim_start_matches('.');
    if !dev_suffix.is_empty() && hostname.ends_with(&format!(".{}", dev_suffix)) {
        return CookieDomain::Shared(format!(".{}", dev_suffix));
    }

    if hostname.parse::<IpAddr>().is_ok() {
        warn!("IP literal host {}, omitting cookie domain", host);
        return CookieDomain::HostOnly(host.to_string());
    }

    let labels: Vec<&str> = hostname.split('.').collect();
    if labels.iter().any(|label| label.is_empty()) {
        warn!("Unexpected host format: {}, returning host directly", host);
        return CookieDomain::HostOnly(host.to_string());
    }

    match labels.len() {
        2 => CookieDomain::Shared(format!(".{}", hostname)),
        n if n >= 3 => CookieDomain::Shared(format!(".{}", labels[1..].join("."))),
        _ => {
            // TODO: reject single-label hosts once every deployment sets COOKIE_DOMAIN.
            warn!("Unexpected host format: {}, returning host directly", host);
            CookieDomain::HostOnly(host.to_string())
        }
    }
}

/// Remove a trailing `:<port>` and the brackets around an IPv6 literal.
fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
