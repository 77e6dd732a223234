// Main entry point for the Swarm API server

use anyhow::{Context, Result};
use server_core::server::{build_app, build_state};
use server_core::{kernel::DbCluster, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting Swarm API");

    let config = Config::from_env().context("failed to load configuration")?;

    tracing::info!("connecting to database...");
    let db = DbCluster::connect(&config).await?;

    tracing::info!("running database migrations...");
    sqlx::migrate!("./migrations")
        .run(db.writes())
        .await
        .context("failed to run migrations")?;

    let state = build_state(&config, db.clone());
    let app = build_app(state.clone());

    // Background engine; runs next to the HTTP server until shutdown.
    state.randomizing_jobs.start();

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shutting down");
    state.randomizing_jobs.stop();
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received shutdown signal");
}
