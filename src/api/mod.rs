//! HTTP API

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, EmbeddingResponse, ImageEmbedRequest, TextEmbedRequest};
pub use routes::build_router;
