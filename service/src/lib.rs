use auth_callback::backend::http::build_client;
use auth_callback::backend::HttpIdentityBackend;
use auth_callback::callback::CallbackHandler;
use config::Config;
use log::info;
use secrecy::SecretString;

pub mod config;
pub mod logging;

// Service-level state containing only infrastructure concerns
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    identity_client: reqwest::Client,
}

impl AppState {
    pub fn new(app_config: Config) -> Result<Self, auth_callback::Error> {
        info!(
            "Identity backend: url={}, timeout={}s",
            app_config.identity_url(),
            app_config.identity_timeout_secs,
        );

        let identity_client = build_client(app_config.identity_timeout())?;

        Ok(Self {
            config: app_config,
            identity_client,
        })
    }

    /// Identity backend scoped to one request. `access_token` is the token of
    /// the session making the request, if any.
    pub fn identity_backend(&self, access_token: Option<SecretString>) -> HttpIdentityBackend {
        HttpIdentityBackend::from_client(
            self.identity_client.clone(),
            self.config.identity_url(),
            self.config.identity_anon_key(),
        )
        .with_access_token(access_token)
    }

    pub fn callback_handler(&self) -> CallbackHandler<HttpIdentityBackend> {
        CallbackHandler::new(self.identity_backend(None), self.config.callback_settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_app_state_builds_handler_from_config() {
        let config = Config::parse_from([
            "admin_auth_rs",
            "--default-redirect-path",
            "/dashboard",
            "--identity-timeout-secs",
            "3",
        ]);

        let app_state = AppState::new(config).unwrap();
        let handler = app_state.callback_handler();

        assert_eq!(handler.settings().default_redirect_path, "/dashboard");
    }
}
