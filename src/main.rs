// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Peace API and presence server
//!
//! Serves the JSON API and the presence websocket on two ports from one
//! process, sharing stores and a shutdown signal.

use anyhow::Context;
use peace::{
    config::{Config, LogFormat},
    db::{PgStore, RedisPresenceStore},
    routes::{create_router, create_ws_router},
    services::GoogleOAuth,
    AppState, Stores,
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long in-flight requests and open sockets get to finish after a
/// shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    init_logging(&config);
    tracing::info!(
        environment = %config.environment,
        api = %config.api_addr(),
        websocket = %config.websocket_addr(),
        "Starting Peace API"
    );

    // Postgres: users, records, quotes
    let pg = Arc::new(
        PgStore::connect(&config.database_url())
            .await
            .context("Failed to connect to Postgres")?,
    );
    pg.run_migrations()
        .await
        .context("Failed to run migrations")?;

    // Redis: presence
    let presence = RedisPresenceStore::connect(&config.redis_url())
        .await
        .context("Failed to connect to Redis")?;

    let stores = Stores {
        users: pg.clone(),
        records: pg.clone(),
        quotes: pg.clone(),
        tags: pg,
        presence: Arc::new(presence),
    };
    let google = Arc::new(GoogleOAuth::new(&config));

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), stores, google));

    let api_listener = tokio::net::TcpListener::bind(config.api_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.api_addr()))?;
    let ws_listener = tokio::net::TcpListener::bind(config.websocket_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.websocket_addr()))?;
    tracing::info!(address = %config.api_addr(), "API server listening");
    tracing::info!(address = %config.websocket_addr(), "Presence server listening");

    let api = axum::serve(api_listener, create_router(state.clone()))
        .with_graceful_shutdown(state.shutdown.clone().cancelled_owned())
        .into_future();
    let ws = axum::serve(ws_listener, create_ws_router(state.clone()))
        .with_graceful_shutdown(state.shutdown.clone().cancelled_owned())
        .into_future();

    let servers = async { tokio::try_join!(api, ws) };
    tokio::pin!(servers);

    let deadline = tokio::select! {
        result = &mut servers => {
            result.context("Server error")?;
            tokio::time::Instant::now() + SHUTDOWN_GRACE
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, draining connections");
            state.shutdown.cancel();
            let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
            match tokio::time::timeout_at(deadline, &mut servers).await {
                Ok(Err(e)) => tracing::error!(error = %e, "Server error during shutdown"),
                Ok(Ok(_)) => {}
                Err(_) => tracing::warn!("Shutdown grace period elapsed"),
            }
            deadline
        }
    };

    // Upgraded sockets outlive the servers; let each save its user offline
    state.shutdown.cancel();
    state.sockets.close();
    if tokio::time::timeout_at(deadline, state.sockets.wait())
        .await
        .is_err()
    {
        tracing::warn!(
            remaining = state.sockets.len(),
            "Presence sockets still open after grace period"
        );
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize logging. JSON by default; `LOG_FORMAT=pretty` for local work.
fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}
