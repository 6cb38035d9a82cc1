//! Health report served on `GET /`

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingModel;

/// Service status; the model is loaded before the listener binds, so a
/// process that answers at all is healthy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub service: String,
    pub model: String,
    pub pretrained: String,
    pub dimension: usize,
    pub version: String,
    /// Unix timestamp
    pub timestamp: i64,
}

impl HealthReport {
    pub fn ok(service: &str, model: &dyn EmbeddingModel) -> Self {
        let info = model.info();
        Self {
            status: "ok".to_string(),
            service: service.to_string(),
            model: info.model_name.clone(),
            pretrained: info.pretrained.clone(),
            dimension: model.dimension(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
