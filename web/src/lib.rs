//! HTTP surface of the admin authentication service: the identity provider
//! callback, its error page, and routes protected by the session guard.

use log::*;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub use self::error::{Error, Result};
pub use service::AppState;

mod controller;
mod cookies;
mod error;
mod extractors;
mod params;
pub mod router;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{}:{}", interface, app_state.config.port);

    info!(
        "Server starting... listening for connections on http://{} [{}]",
        server_url,
        app_state.config.runtime_env()
    );

    let listener = TcpListener::bind(&server_url).await?;
    let router = router::define_routes(app_state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}
