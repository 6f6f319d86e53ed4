use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::api::create_router;
use crate::config::Config;
use crate::error::Result;
use crate::service::ActivityService;

/// Bind the configured address and serve until Ctrl-C
pub async fn run_serve(config: Config, service: Arc<ActivityService>) -> Result<()> {
    let app = create_router(service, &config.server);

    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;

    tracing::info!(
        address = %config.server.bind_address,
        timer_seconds = config.timer.default_duration_seconds,
        "limitlab API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
