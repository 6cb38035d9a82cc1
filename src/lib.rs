//! Embeddings Service - cross-modal text and image embeddings over HTTP
//!
//! Wraps a pretrained CLIP-style model so that text queries and images land in
//! the same vector space, for similarity search elsewhere.
//!
//! ## Endpoints
//!
//! - `GET /`: health report (no auth)
//! - `POST /embed-text`: `{"query": "..."}` → `{"embedding": [...]}`
//! - `POST /embed-image`: `{"url": "..."}` → `{"embedding": [...]}`
//!
//! Both `POST` endpoints require `Authorization: Bearer <token>` matching the
//! configured shared secret; anything else is answered with 403.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use embeddings_service::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = Settings::from_env()?;
//!     let model = ClipModel::from_settings(&settings)?;
//!     embeddings_service::server::serve(&settings, Arc::new(model)).await
//! }
//! ```

pub mod api;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fetcher;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod shutdown;

pub use config::Settings;
pub use error::{Result, ServiceError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::embedding::{ClipModel, Embedding, EmbeddingModel, ModelInfo};
    pub use crate::error::{AuthError, FetchError, ModelError, Result, ServiceError, ValidationError};
    pub use crate::fetcher::{FetchedImage, FetcherConfig, ImageFetcher};
    pub use crate::middleware::{AuthConfig, AuthGate, InputValidator};
}
