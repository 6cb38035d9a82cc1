//! Error types for the embeddings service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

pub use crate::middleware::{AuthError, ValidationError};

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the embeddings service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while downloading an image
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch image from {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Timed out after {secs} seconds fetching image from {url}")]
    Timeout { url: String, secs: u64 },

    #[error("Upstream returned {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Image at {url} is too large: more than {max_bytes} bytes")]
    TooLarge { url: String, max_bytes: usize },

    #[error("Image at {url} has an empty body")]
    EmptyBody { url: String },
}

/// Errors raised by the model adapter
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to load model: {0}")]
    Load(String),

    #[error("Cannot decode image ({content_type}): {reason}")]
    UndecodableImage { content_type: String, reason: String },

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}

impl From<ort::Error> for ModelError {
    fn from(err: ort::Error) -> Self {
        ModelError::Inference(err.to_string())
    }
}

impl From<config::ConfigError> for ServiceError {
    fn from(err: config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub error: &'static str,
}

impl ServiceError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Auth(_) => StatusCode::FORBIDDEN,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Fetch(FetchError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Model(_) | ServiceError::Config(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable discriminator reported in the `error` field
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Auth(_) => "auth",
            ServiceError::Validation(_) => "validation",
            ServiceError::PayloadTooLarge(_) => "payload_too_large",
            ServiceError::Fetch(FetchError::Timeout { .. }) => "fetch_timeout",
            ServiceError::Fetch(_) => "fetch",
            ServiceError::Model(ModelError::UndecodableImage { .. }) => "undecodable_image",
            ServiceError::Model(_) => "model",
            ServiceError::Config(_) => "config",
            ServiceError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(kind = self.kind(), "Request failed: {}", self);
        } else {
            warn!(kind = self.kind(), "Request rejected: {}", self);
        }

        let body = ErrorBody {
            detail: self.to_string(),
            error: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
