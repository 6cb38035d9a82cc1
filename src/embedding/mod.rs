//! Cross-modal embedding model adapter

pub mod clip;
pub mod preprocess;

pub use clip::ClipModel;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::error::ModelError;

/// A text or image embedding; unit length, fixed dimension per model
pub type Embedding = Vec<f32>;

/// Identity of the loaded model
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub model_name: String,
    pub pretrained: String,
}

/// A model that embeds text and images into the same vector space.
///
/// Implementations are loaded once and shared read-only across requests.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Generate the embedding for a text query
    async fn embed_text(&self, text: &str) -> Result<Embedding, ModelError>;

    /// Generate the embedding for encoded image bytes (PNG, JPEG, ...).
    /// Decoding is CPU-bound and belongs off the async workers.
    async fn embed_image(&self, bytes: Bytes, content_type: Option<&str>) -> Result<Embedding, ModelError>;

    /// Dimension of every embedding this model produces
    fn dimension(&self) -> usize;

    /// Model identifiers reported by the health endpoint
    fn info(&self) -> &ModelInfo;
}

/// Run CPU-bound model work on the blocking pool
pub(crate) async fn run_blocking<T, F>(task: &'static str, f: F) -> Result<T, ModelError>
where
    F: FnOnce() -> Result<T, ModelError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ModelError::Inference(format!("{} task failed: {}", task, e)))?
}

/// Scale a vector to unit L2 norm; a zero vector is returned unchanged
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}
