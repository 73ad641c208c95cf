use auth_callback::callback::{CallbackSettings, DEFAULT_ERROR_PATH, DEFAULT_FALLBACK_HOST};
use auth_callback::cookie::{CookieDomainResolver, SessionCookieSettings, DEFAULT_DEV_SUFFIX};
use auth_callback::guard::GuardPaths;
use auth_callback::messages::Locale;
use auth_callback::redirect::RedirectAllowList;
use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Local identity backend started by the development tooling.
pub const DEFAULT_IDENTITY_URL: &str = "http://localhost:54321/auth/v1";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,

    /// Base URL of the identity backend's auth API.
    #[arg(long, env, default_value = DEFAULT_IDENTITY_URL)]
    identity_url: String,

    /// Public (anon) API key sent with every identity backend request.
    #[arg(long, env)]
    identity_anon_key: Option<String>,

    /// Timeout in seconds for a single identity backend request
    #[arg(long, env, default_value_t = 10)]
    pub identity_timeout_secs: u64,

    /// Explicit cookie `Domain` attribute. When unset, the domain is derived
    /// from the request host.
    #[arg(long, env)]
    cookie_domain: Option<String>,

    /// Development domain whose subdomains share one cookie domain.
    #[arg(long, env, default_value = DEFAULT_DEV_SUFFIX)]
    dev_cookie_suffix: String,

    /// Host assumed when a callback request carries no Host header.
    #[arg(long, env, default_value = DEFAULT_FALLBACK_HOST)]
    fallback_host: String,

    /// Origins allowed as post-login redirect targets. Defaults to the
    /// application's own sites when empty.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    allowed_redirect_origins: Vec<String>,

    /// Path to land on after login when the callback names no target.
    #[arg(long, env, default_value = "/")]
    default_redirect_path: String,

    /// Path of the page explaining a failed callback.
    #[arg(long, env, default_value = DEFAULT_ERROR_PATH)]
    callback_error_path: String,

    /// Where unauthenticated requests to protected routes are sent.
    #[arg(long, env, default_value = "/")]
    sign_in_path: String,

    /// Where requests with a pending second factor are sent.
    #[arg(long, env, default_value = "/")]
    mfa_verify_path: String,

    /// Name of the cookie carrying the established session.
    #[arg(long, env, default_value = "sb-auth-token")]
    session_cookie_name: String,

    /// Session cookie lifetime in seconds (default: 7 days)
    #[arg(long, env, default_value_t = 604_800)]
    pub session_cookie_max_age_secs: i64,

    /// Language of the messages shown on the callback error page.
    #[arg(
        long,
        env,
        default_value_t = Locale::Ja,
        value_parser = clap::builder::PossibleValuesParser::new(["ja", "en", "JA", "EN"])
            .map(|s| s.parse::<Locale>().unwrap()),
    )]
    pub message_locale: Locale,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    pub fn identity_anon_key(&self) -> SecretString {
        SecretString::new(self.identity_anon_key.clone().unwrap_or_default())
    }

    pub fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }

    pub fn cookie_domain(&self) -> Option<String> {
        self.cookie_domain.clone()
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.session_cookie_name
    }

    pub fn fallback_host(&self) -> &str {
        &self.fallback_host
    }

    pub fn allowed_redirect_origins(&self) -> RedirectAllowList {
        let origins: Vec<String> = self
            .allowed_redirect_origins
            .iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        if origins.is_empty() {
            RedirectAllowList::default()
        } else {
            RedirectAllowList::new(origins)
        }
    }

    /// Settings for the callback orchestrator.
    pub fn callback_settings(&self) -> CallbackSettings {
        CallbackSettings {
            default_redirect_path: self.default_redirect_path.clone(),
            error_path: self.callback_error_path.clone(),
            allow_list: self.allowed_redirect_origins(),
            cookie_domains: CookieDomainResolver::new(self.dev_cookie_suffix.clone())
                .with_override(self.cookie_domain()),
            session_cookie: SessionCookieSettings::new(
                self.session_cookie_name.clone(),
                self.session_cookie_max_age_secs,
            ),
            locale: self.message_locale,
            fallback_host: self.fallback_host.clone(),
        }
    }

    /// Redirect targets for the session requirement guard.
    pub fn guard_paths(&self) -> GuardPaths {
        GuardPaths {
            sign_in_path: self.sign_in_path.clone(),
            mfa_verify_path: self.mfa_verify_path.clone(),
        }
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
