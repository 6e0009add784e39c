mod config;

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use fyp_api::AppStateInner;
use fyp_core::Dispatcher;
use fyp_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fyp_match=debug,fyp_api=debug,fyp_core=debug,fyp_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.sync_token.is_none() {
        warn!("FYP_SYNC_TOKEN not set; profile sync endpoint is disabled");
    }

    let db = Arc::new(Database::open(&config.db_path, config.busy_timeout)?);

    let dispatcher = Dispatcher::new();
    tokio::spawn(log_events(dispatcher.clone()));

    let state = AppStateInner::new(db, dispatcher, config.jwt_secret, config.sync_token);

    let app = fyp_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("FYP matching server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Trace every committed state change.
async fn log_events(dispatcher: Dispatcher) {
    let mut rx = dispatcher.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => info!(?event, "State change"),
            Err(RecvError::Lagged(skipped)) => warn!("Event log lagged, skipped {} events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
