use std::sync::Arc;
use std::time::Duration;

use domain::gateway::oauth::{oidc, MemoryStateStore};
use domain::{FlowController, FlowSettings, MemorySessionStore};
use log::*;
use service::{config::Config, logging::Logger};
use web::{AppState, WebSettings};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting login service [{}] for issuer {}",
        config.runtime_env(),
        config.issuer_url
    );

    let provider = match oidc::connect(&config).await {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to set up the OpenID Connect provider: {e:?}");
            std::process::exit(1);
        }
    };

    let state_ttl = chrono::Duration::seconds(config.state_ttl_secs as i64);
    let flow = Arc::new(FlowController::new(
        Arc::new(provider),
        Arc::new(MemoryStateStore::with_ttl(state_ttl)),
        Arc::new(MemorySessionStore::new()),
        FlowSettings::from(&config),
    ));

    spawn_purge_task(
        Arc::clone(&flow),
        Duration::from_secs(config.purge_interval_secs.max(1)),
    );

    let app_state = AppState::new(flow, WebSettings::from(&config));
    if let Err(e) = web::init_server(&config, app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}

fn spawn_purge_task(flow: Arc<FlowController>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match flow.purge_expired().await {
                Ok((0, 0)) => {}
                Ok((states, sessions)) => {
                    debug!("Purged {states} expired states and {sessions} expired sessions")
                }
                Err(e) => warn!("Purging expired entries failed: {e:?}"),
            }
        }
    });
}
