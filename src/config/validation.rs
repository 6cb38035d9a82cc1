//! Settings validation

use super::*;
use crate::error::{Result, ServiceError};
use secrecy::ExposeSecret;

const LOG_FORMATS: [&str; 3] = ["json", "compact", "pretty"];

/// Validate complete settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_auth(settings)?;
    validate_model(settings)?;
    validate_server(settings)?;
    validate_fetch(settings)?;
    validate_logging(settings)?;
    Ok(())
}

fn validate_auth(settings: &Settings) -> Result<()> {
    if settings.auth_token.expose_secret().trim().is_empty() {
        return Err(ServiceError::Config(
            "auth_token is required".to_string()
        ));
    }

    Ok(())
}

fn validate_model(settings: &Settings) -> Result<()> {
    if settings.model_name.trim().is_empty() {
        return Err(ServiceError::Config(
            "model_name cannot be empty".to_string()
        ));
    }

    if settings.pretrained.trim().is_empty() {
        return Err(ServiceError::Config(
            "pretrained cannot be empty".to_string()
        ));
    }

    if settings
        .model_dir
        .as_ref()
        .is_some_and(|dir| dir.as_os_str().is_empty())
    {
        return Err(ServiceError::Config(
            "model_dir cannot be empty".to_string()
        ));
    }

    if settings.intra_threads == 0 {
        return Err(ServiceError::Config(
            "intra_threads must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate listener and runtime settings
pub fn validate_server(settings: &Settings) -> Result<()> {
    if settings.port == 0 {
        return Err(ServiceError::Config(
            "Server port cannot be 0".to_string()
        ));
    }

    if settings.host.is_empty() {
        return Err(ServiceError::Config(
            "Server host cannot be empty".to_string()
        ));
    }

    if settings.workers == 0 || settings.workers > 512 {
        return Err(ServiceError::Config(
            format!("workers must be between 1 and 512 (got {})", settings.workers)
        ));
    }

    if settings.max_body_bytes == 0 {
        return Err(ServiceError::Config(
            "max_body_bytes must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_fetch(settings: &Settings) -> Result<()> {
    if settings.fetch_timeout_secs == 0 {
        return Err(ServiceError::Config(
            "fetch_timeout_secs must be greater than 0".to_string()
        ));
    }

    if settings.fetch_timeout_secs > 300 {
        return Err(ServiceError::Config(
            "fetch_timeout_secs too large (max: 300 seconds)".to_string()
        ));
    }

    if settings.max_image_bytes == 0 {
        return Err(ServiceError::Config(
            "max_image_bytes must be greater than 0".to_string()
        ));
    }

    Ok(())
}

fn validate_logging(settings: &Settings) -> Result<()> {
    if !LOG_FORMATS.contains(&settings.log_format.as_str()) {
        return Err(ServiceError::Config(
            format!(
                "Unknown log_format '{}' (expected one of {:?})",
                settings.log_format, LOG_FORMATS
            )
        ));
    }

    Ok(())
}
