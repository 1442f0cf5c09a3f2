// Main entry point for the aggregation API server

use anyhow::{Context, Result};
use server_core::server::{build_app, build_state};
use server_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pharma intelligence aggregation API");

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        reports_dir = %config.reports_dir.display(),
        "Configuration loaded"
    );

    let state = build_state(&config, None).context("Failed to build application state")?;
    let app = build_app(state, &config.frontend_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
