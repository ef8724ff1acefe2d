use anyhow::Context;

use roster_api::{ApiConfig, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env().context("invalid configuration")?;
    roster_observability::init(config.log_format);

    let bind_addr = config.bind_addr;
    let services = app::build_services(config).context("failed to start services")?;
    let router = app::router(services.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Let in-flight jobs finish before exiting.
    tokio::task::spawn_blocking(move || services.shutdown_workers())
        .await
        .context("worker shutdown panicked")?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
