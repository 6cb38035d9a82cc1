//! Embeddings Service Binary
//!
//! Loads settings and the model, then serves the HTTP API until SIGINT/SIGTERM.
//! The model is loaded before the listener binds; a load failure exits the
//! process without accepting traffic.

use anyhow::Context;
use embeddings_service::{
    config::Settings,
    embedding::{ClipModel, EmbeddingModel},
    observability::init_logging,
    server,
};
use std::sync::Arc;
use tracing::info;

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let settings = Settings::from_file_with_env(&config_path)
        .with_context(|| format!("Failed to load settings (config file: {})", config_path))?;

    init_logging(&settings);
    info!("Starting {} v{}", settings.service_name, env!("CARGO_PKG_VERSION"));
    info!(
        "Settings loaded: model={} ({}), port={}, workers={}",
        settings.model_name, settings.pretrained, settings.port, settings.workers
    );

    let model = ClipModel::from_settings(&settings).context("Failed to load embedding model")?;
    info!(
        "Model loaded successfully ({} dimensions) - ready to accept requests",
        model.dimension()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.workers)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(server::serve(&settings, Arc::new(model)))?;

    info!("Shutting down");
    Ok(())
}
