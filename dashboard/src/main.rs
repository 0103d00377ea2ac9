mod classify;
mod config;
mod errors;
mod metrics;
mod model;
mod mqtt;
mod rest;
mod session;
mod source;
mod status;
mod view;

use clap::Parser;
use classify::Classifier;
use config::Config;
use mqtt::MqttSource;
use session::DashboardState;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting soil dashboard");
    info!("App ID: {}", config.app_id);
    info!("HTTP server: {}", config.http_addr);

    metrics::init_metrics()?;

    let classifier = Classifier::new(config.range_check());
    info!("Range check: {:?}", classifier.range_check());

    let (state_tx, state_rx) = watch::channel(DashboardState::default());

    // A bad backend blob is a startup failure shown on the dashboard, not a crash
    let session_handle = match config.backend() {
        Ok(backend) => {
            info!("Broker: {}:{}", backend.host, backend.port);
            let source = MqttSource::new(&backend, config.initial_auth_token.as_deref());
            let document = config.document_path();
            info!("Watching document {}", document);
            Some(tokio::spawn(session::run_session(
                source, document, classifier, state_tx,
            )))
        }
        Err(e) => {
            error!("Failed to initialize telemetry source: {}", e);
            state_tx.send_modify(|s| s.auth_failed(&e));
            None
        }
    };

    let app = rest::create_router(state_rx);
    let http_addr = config.http_addr.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = rest::serve(&http_addr, app).await {
            error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    if let Some(handle) = session_handle {
        handle.abort();
    }
    info!("Shutting down");
    Ok(())
}
