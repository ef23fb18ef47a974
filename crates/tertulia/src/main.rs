#[macro_use]
extern crate tracing;

use anyhow::{Context, Result};
use tertulia::AppState;
use tertulia::config::Settings;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::load()?;
    let state = AppState::from_settings(&settings)?;

    // The store is read-only once the server is up.
    state.rag.ingest_file(&settings.rag.document_path).await;
    state.rag.log_probe(&settings.rag.probe_text).await;

    let address = settings.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("listening on {address}");

    axum::serve(listener, tertulia::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("bye");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
}
