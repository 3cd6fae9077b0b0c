use std::sync::Arc;

use anyhow::Context;

use loanledger_api::app::{build_app_with, services::build_services};
use loanledger_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    loanledger_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(
        build_services(&config)
            .await
            .context("failed to wire services")?,
    );
    let app = build_app_with(services.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Worker shutdown joins a thread that blocks on this runtime.
    tokio::task::spawn_blocking(move || services.shutdown())
        .await
        .context("recorder worker shutdown panicked")?;
    tracing::info!("stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
