//! Settings loader with environment variable support

use super::Settings;
use crate::error::Result;
use config::{builder::DefaultState, ConfigBuilder, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Load settings from an optional TOML file, then the process environment.
///
/// Environment variables take precedence and carry no prefix, so
/// `AUTH_TOKEN`, `MODEL_NAME`, `PRETRAINED` and `PORT` map directly onto
/// the corresponding keys.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        debug!("Reading settings file {} (optional)", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
    }

    build(builder.add_source(environment()))
}

fn environment() -> Environment {
    Environment::default().try_parsing(true)
}

fn build(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}
