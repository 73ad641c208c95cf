//! Inbound callback request.

use url::Url;

use crate::error::Error;

/// Host assumed when the request carries no `Host` header.
pub const DEFAULT_FALLBACK_HOST: &str = "web.saedgewell.test";

/// The request headers the callback pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestHeaders {
    pub host: Option<String>,
    /// `x-forwarded-proto`, set by the reverse proxy.
    pub forwarded_proto: Option<String>,
    pub referer: Option<String>,
    pub origin: Option<String>,
}

/// One callback request, immutable for the duration of an evaluation.
///
/// The effective URL is rebuilt from `x-forwarded-proto` and `Host` because
/// the proxy in front of the server rewrites the upstream URL to localhost.
#[derive(Debug, Clone)]
pub struct CallbackRequest {
    url: Url,
    host: String,
    headers: RequestHeaders,
}

impl CallbackRequest {
    pub fn from_parts(
        path_and_query: &str,
        headers: RequestHeaders,
        fallback_host: &str,
    ) -> Result<Self, Error> {
        let host = headers
            .host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .unwrap_or(fallback_host)
            .to_string();

        let scheme = headers
            .forwarded_proto
            .as_deref()
            .and_then(|proto| proto.split(',').next())
            .map(str::trim)
            .filter(|proto| *proto == "http" || *proto == "https")
            .unwrap_or("https");

        let path_and_query = if path_and_query.starts_with('/') {
            path_and_query.to_string()
        } else {
            format!("/{}", path_and_query)
        };

        let url = Url::parse(&format!("{}://{}{}", scheme, host, path_and_query))?;

        Ok(Self { url, host, headers })
    }

    /// Effective URL as seen by the browser.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `Host` header value, port included.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn headers(&self) -> &RequestHeaders {
        &self.headers
    }

    /// First non-empty value of a query parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    }

    pub fn code(&self) -> Option<String> {
        self.param("code")
    }

    pub fn token_hash(&self) -> Option<String> {
        self.param("token_hash")
    }

    /// Raw `type` parameter of an emailed token.
    pub fn otp_type(&self) -> Option<String> {
        self.param("type")
    }

    pub fn state(&self) -> Option<String> {
        self.param("state")
    }

    /// Post-login target from `next`, or the legacy `callback` parameter.
    pub fn next(&self) -> Option<String> {
        self.param("next").or_else(|| self.param("callback"))
    }

    pub fn error(&self) -> Option<String> {
        self.param("error")
    }

    pub fn error_description(&self) -> Option<String> {
        self.param("error_description")
    }
}
