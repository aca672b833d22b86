use std::sync::Arc;
use std::time::Duration;

use domain::FlowController;
use log::*;
use service::config::Config;

mod controller;
mod cookies;
mod error;
pub mod router;

#[cfg(test)]
mod test_support;

pub use self::error::{Error, Result};

/// Cookie and redirect settings of the HTTP surface.
#[derive(Debug, Clone)]
pub struct WebSettings {
    pub secure_cookies: bool,
    pub cookie_ttl: Duration,
    pub success_redirect_path: String,
    /// Requests running longer than this are answered with 408.
    pub request_timeout: Duration,
}

impl From<&Config> for WebSettings {
    fn from(config: &Config) -> Self {
        Self {
            secure_cookies: config.secure_cookies,
            cookie_ttl: Duration::from_secs(config.session_ttl_secs),
            success_redirect_path: config.success_redirect_path.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<FlowController>,
    pub settings: WebSettings,
}

impl AppState {
    pub fn new(flow: Arc<FlowController>, settings: WebSettings) -> Self {
        Self { flow, settings }
    }
}

pub async fn init_server(config: &Config, app_state: AppState) -> std::io::Result<()> {
    let host = config.interface();
    let server_url = format!("{host}:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&server_url).await?;

    if !app_state.settings.secure_cookies {
        warn!("Login cookies are not marked Secure; use only for local development");
    }
    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, router::define_routes(app_state)).await
}
