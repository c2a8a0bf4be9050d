//! Windsock server - always-on launch decision backend

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use windsock_server::config::Config;
use windsock_server::state::AppState;
use windsock_server::{api, loops, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("windsock_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting windsock server...");

    let config = Config::from_env();
    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(db, config));

    let (shutdown_tx, _) = broadcast::channel(1);

    if state.config().disable_collectors {
        tracing::warn!("collectors disabled by configuration");
    } else {
        tokio::spawn(loops::collect_loop::run_collect_loop(
            state.clone(),
            shutdown_tx.subscribe(),
        ));
    }
    if state.config().disable_decision_loop {
        tracing::warn!("decision loop disabled by configuration");
    } else {
        tokio::spawn(loops::decision_loop::run_decision_loop(
            state.clone(),
            shutdown_tx.subscribe(),
        ));
    }

    let app = api::routes()
        .with_state(state)
        .layer(CorsLayer::permissive());

    tracing::info!("Listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    Ok(())
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(());
}
