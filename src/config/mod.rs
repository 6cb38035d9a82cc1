//! Configuration management for the embeddings service

use serde::Deserialize;
use secrecy::Secret;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod loader;
pub mod validation;

/// Service settings, loaded from an optional TOML file overlaid by the
/// environment. Keys are flat so they map one-to-one onto variables such as
/// `AUTH_TOKEN` or `PORT`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Shared bearer secret (secured)
    #[serde(deserialize_with = "deserialize_secret")]
    pub auth_token: Secret<String>,

    /// Name reported by the health endpoint
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Model identifier (e.g., "ViT-B-32")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Pretrained weights identifier (e.g., "laion2b_s34b_b79k")
    #[serde(default = "default_pretrained")]
    pub pretrained: String,

    /// Directory holding text_model.onnx, vision_model.onnx and tokenizer.json.
    /// Unset means `models/{model_name}/{pretrained}`.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// ONNX Runtime intra-op threads per session
    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,

    /// Listen host
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Runtime worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Image fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Maximum image size in bytes
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json, compact or pretty
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_service_name() -> String { "embeddings-service".to_string() }
fn default_model_name() -> String { "ViT-B-32".to_string() }
fn default_pretrained() -> String { "laion2b_s34b_b79k".to_string() }
const MODELS_ROOT: &str = "models";
fn default_intra_threads() -> usize { 4 }
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_workers() -> usize { 4 }
fn default_fetch_timeout() -> u64 { 30 }
fn default_max_image_bytes() -> usize { 20 * 1024 * 1024 } // 20 MiB
fn default_max_body_bytes() -> usize { 1024 * 1024 } // 1 MiB
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load settings from the environment only
    pub fn from_env() -> crate::error::Result<Self> {
        let settings = loader::load_settings(None)?;
        validation::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Load settings from a TOML file (if it exists) with environment overrides
    pub fn from_file_with_env<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let settings = loader::load_settings(Some(path.as_ref()))?;
        validation::validate_settings(&settings)?;
        Ok(settings)
    }

    /// Validate these settings
    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_settings(self)
    }

    /// Socket address to bind
    pub fn listen_addr(&self) -> crate::error::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| crate::error::ServiceError::Config(format!(
                "Invalid listen address {}:{}: {}",
                self.host, self.port, e
            )))
    }

    /// Directory the model weights are loaded from
    pub fn resolved_model_dir(&self) -> PathBuf {
        match &self.model_dir {
            Some(dir) => dir.clone(),
            None => Path::new(MODELS_ROOT)
                .join(&self.model_name)
                .join(&self.pretrained),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Settings with every default applied and the given token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            auth_token: Secret::new(token.into()),
            service_name: default_service_name(),
            model_name: default_model_name(),
            pretrained: default_pretrained(),
            model_dir: None,
            intra_threads: default_intra_threads(),
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
            fetch_timeout_secs: default_fetch_timeout(),
            max_image_bytes: default_max_image_bytes(),
            max_body_bytes: default_max_body_bytes(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Custom deserializer for Secret<String>
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Secret<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Secret::new(s))
}
