//! Raffle HTTP server.

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use raffle_auth::TokenIssuer;
use raffle_core::environment::SystemClock;
use raffle_postgres::PostgresStore;
use raffle_server::{AppState, Config, build_router, metrics::register_business_metrics};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Raffle HTTP Server");
    info!(
        bind = %format!("{}:{}", config.server.host, config.server.port),
        metrics_port = config.server.metrics_port,
        db_max_connections = config.database.max_connections,
        token_ttl_secs = config.auth.token_ttl,
        "Configuration loaded"
    );

    // Metrics
    let metrics_addr = config.server.metrics_addr()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .context("Failed to install Prometheus exporter")?;
    register_business_metrics();
    info!(%metrics_addr, "Prometheus exporter listening");

    // Database
    info!("Connecting to database...");
    let store = PostgresStore::connect(&config.database.settings())
        .await
        .context("Failed to connect to database")?;
    if config.database.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
    } else {
        warn!("RUN_MIGRATIONS=false, skipping migrations");
    }

    // Application state
    let tokens = TokenIssuer::new(config.auth.jwt_secret.as_bytes())
        .with_ttl(chrono::Duration::seconds(config.auth.token_ttl))
        .with_issuer(config.auth.issuer.clone());
    let state = AppState::from_store(&store, tokens, Arc::new(SystemClock));
    let app = build_router(state, &config.server.cors_allowed_origins);

    let bind_addr = config.server.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(%bind_addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Draining database connections...");
    let timeout = Duration::from_secs(config.server.shutdown_timeout);
    if tokio::time::timeout(timeout, store.close()).await.is_err() {
        warn!(timeout_secs = config.server.shutdown_timeout, "Timed out closing database pool");
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
