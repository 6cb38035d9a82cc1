//! API request handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{
    embedding::{Embedding, EmbeddingModel},
    error::{Result, ServiceError},
    fetcher::ImageFetcher,
    middleware::{InputValidator, ValidationError},
    observability::HealthReport,
};

/// Characters of the query echoed into logs
const LOGGED_QUERY_CHARS: usize = 50;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn EmbeddingModel>,
    pub fetcher: Arc<ImageFetcher>,
    pub service_name: Arc<str>,
}

/// Request to embed a text query
#[derive(Debug, Deserialize)]
pub struct TextEmbedRequest {
    pub query: String,
}

/// Request to embed the image behind a URL
#[derive(Debug, Deserialize)]
pub struct ImageEmbedRequest {
    pub url: String,
}

/// Response carrying one embedding
#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embedding: Embedding,
}

/// Extractor failures are validation errors, except an exceeded body limit
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload.map(|Json(req)| req).map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServiceError::PayloadTooLarge(rejection.body_text())
        } else {
            ValidationError::InvalidBody(rejection.body_text()).into()
        }
    })
}

/// `GET /`
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::ok(&state.service_name, state.model.as_ref()))
}

/// `POST /embed-text`
pub async fn embed_text(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TextEmbedRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>> {
    let req = body(payload)?;
    InputValidator::validate_query(&req.query)?;

    let preview: String = req.query.chars().take(LOGGED_QUERY_CHARS).collect();
    info!("Generating text embedding for query: {}", preview);

    let embedding = state.model.embed_text(&req.query).await?;
    info!("Generated embedding with {} dimensions", embedding.len());

    Ok(Json(EmbeddingResponse { embedding }))
}

/// `POST /embed-image`
pub async fn embed_image(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ImageEmbedRequest>, JsonRejection>,
) -> Result<Json<EmbeddingResponse>> {
    let req = body(payload)?;
    let url = InputValidator::validate_image_url(&req.url)?;

    info!("Generating image embedding for URL: {}", url);
    let image = state.fetcher.fetch(&url).await?;

    let embedding = state
        .model
        .embed_image(image.bytes, image.content_type.as_deref())
        .await?;
    info!("Generated embedding with {} dimensions", embedding.len());

    Ok(Json(EmbeddingResponse { embedding }))
}
