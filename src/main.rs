use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use histo_classifier_rs::{
    build_router, utils::ensure_weights_exist, AppState, Config, InferenceEngine, TfModel,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Invalid configuration")?;
    ensure_weights_exist(&config.model_path, config.model_url.as_deref()).await?;

    let model = TfModel::load(&config.model_path, &config.input_op, &config.output_op)
        .context("Failed to load model")?;
    let state = Arc::new(AppState {
        engine: InferenceEngine::new(Arc::new(model)),
    });

    let app = build_router(state, config.body_limit_bytes);

    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_addr()))?;
    info!("Listening on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
