//! HTTP server assembly

use axum::Router;
use std::sync::Arc;
use tracing::info;

use crate::{
    api::{build_router, AppState},
    config::Settings,
    embedding::EmbeddingModel,
    error::{Result, ServiceError},
    fetcher::{FetcherConfig, ImageFetcher},
    middleware::{AuthConfig, AuthGate},
    shutdown::shutdown_signal,
};

/// Build the application router around an already-loaded model
pub fn build_app(settings: &Settings, model: Arc<dyn EmbeddingModel>) -> Result<Router> {
    let fetcher = Arc::new(ImageFetcher::new(FetcherConfig::from_settings(settings))?);

    let auth_gate = Arc::new(AuthGate::new(AuthConfig::new(settings.auth_token.clone())));

    let state = AppState {
        model,
        fetcher,
        service_name: Arc::from(settings.service_name.as_str()),
    };

    Ok(build_router(state, auth_gate, settings.max_body_bytes))
}

/// Bind the listener and serve until a shutdown signal arrives
pub async fn serve(settings: &Settings, model: Arc<dyn EmbeddingModel>) -> Result<()> {
    let app = build_app(settings, model)?;
    let addr = settings.listen_addr()?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServiceError::Internal(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}
