//! Input validation for embedding requests

use tracing::{debug, warn};
use url::Url;

/// Maximum query length in characters
pub const MAX_QUERY_CHARS: usize = 5000;

/// Maximum image URL length
const MAX_URL_LENGTH: usize = 2048;

/// Input validator
pub struct InputValidator;

impl InputValidator {
    /// Validate a text query
    pub fn validate_query(query: &str) -> Result<(), ValidationError> {
        if query.trim().is_empty() {
            warn!("Validation failed: empty query");
            return Err(ValidationError::EmptyQuery);
        }

        let length = query.chars().count();
        if length > MAX_QUERY_CHARS {
            warn!("Validation failed: query too long ({} > {})", length, MAX_QUERY_CHARS);
            return Err(ValidationError::QueryTooLong {
                length,
                max_length: MAX_QUERY_CHARS,
            });
        }

        debug!("Query validation passed");
        Ok(())
    }

    /// Validate an image URL and return it parsed
    pub fn validate_image_url(raw: &str) -> Result<Url, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            warn!("Validation failed: empty url");
            return Err(ValidationError::EmptyUrl);
        }

        if raw.len() > MAX_URL_LENGTH {
            warn!("Validation failed: url too long ({} > {})", raw.len(), MAX_URL_LENGTH);
            return Err(ValidationError::UrlTooLong {
                length: raw.len(),
                max_length: MAX_URL_LENGTH,
            });
        }

        let url = Url::parse(raw).map_err(|e| {
            warn!("Validation failed: unparseable url: {}", e);
            ValidationError::InvalidUrl(e.to_string())
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            warn!("Validation failed: unsupported url scheme {}", url.scheme());
            return Err(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }

        if url.host_str().map_or(true, str::is_empty) {
            return Err(ValidationError::InvalidUrl("URL has no host".to_string()));
        }

        debug!("Image URL validation passed");
        Ok(url)
    }
}

/// Validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Query must not be empty")]
    EmptyQuery,

    #[error("Query too long: {length} characters (max: {max_length})")]
    QueryTooLong { length: usize, max_length: usize },

    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("URL too long: {length} characters (max: {max_length})")]
    UrlTooLong { length: usize, max_length: usize },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_query_success() {
        assert!(InputValidator::validate_query("landscape painting").is_ok());
        assert!(InputValidator::validate_query("Picasso's 'Guernica' & Matisse's œuvres").is_ok());
    }

    #[test]
    fn test_validate_query_empty() {
        assert_eq!(InputValidator::validate_query(""), Err(ValidationError::EmptyQuery));
        assert_eq!(InputValidator::validate_query("   \n"), Err(ValidationError::EmptyQuery));
    }

    #[test]
    fn test_validate_query_length_counts_chars() {
        let at_limit = "é".repeat(MAX_QUERY_CHARS);
        assert!(InputValidator::validate_query(&at_limit).is_ok());

        let over = "a".repeat(MAX_QUERY_CHARS + 1);
        assert!(matches!(
            InputValidator::validate_query(&over),
            Err(ValidationError::QueryTooLong { .. })
        ));
    }

    #[test]
    fn test_validate_image_url() {
        let url = InputValidator::validate_image_url("https://example.org/default.jpg").unwrap();
        assert_eq!(url.host_str(), Some("example.org"));
        assert!(InputValidator::validate_image_url("http://127.0.0.1:8080/a.png").is_ok());
    }

    #[test]
    fn test_validate_image_url_rejects_garbage() {
        assert!(matches!(
            InputValidator::validate_image_url("not-a-url"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert_eq!(InputValidator::validate_image_url(""), Err(ValidationError::EmptyUrl));
        assert_eq!(
            InputValidator::validate_image_url("ftp://example.org/a.jpg"),
            Err(ValidationError::UnsupportedScheme("ftp".to_string()))
        );
        assert!(matches!(
            InputValidator::validate_image_url("file:///etc/passwd"),
            Err(ValidationError::UnsupportedScheme(_))
        ));
    }
}
